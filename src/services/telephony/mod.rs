pub mod twilio;

use async_trait::async_trait;

#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Places an outbound call whose TwiML is fetched from `twiml_url`.
    /// Returns the provider's call identifier.
    async fn place_call(
        &self,
        to: &str,
        twiml_url: &str,
        status_callback: &str,
    ) -> anyhow::Result<String>;
}
