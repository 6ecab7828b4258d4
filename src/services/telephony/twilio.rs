use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::TelephonyProvider;

pub struct TwilioVoiceProvider {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CreatedCall {
    sid: String,
}

impl TwilioVoiceProvider {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TelephonyProvider for TwilioVoiceProvider {
    async fn place_call(
        &self,
        to: &str,
        twiml_url: &str,
        status_callback: &str,
    ) -> anyhow::Result<String> {
        anyhow::ensure!(
            !self.account_sid.is_empty() && !self.from_number.is_empty(),
            "Twilio voice is not configured"
        );

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Calls.json",
            self.account_sid
        );

        let created: CreatedCall = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to),
                ("From", self.from_number.as_str()),
                ("Url", twiml_url),
                ("StatusCallback", status_callback),
                ("StatusCallbackMethod", "POST"),
            ])
            .send()
            .await
            .context("failed to create Twilio call")?
            .error_for_status()
            .context("Twilio API returned error")?
            .json()
            .await
            .context("failed to parse Twilio call response")?;

        Ok(created.sid)
    }
}
