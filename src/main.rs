use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use receptionist::config::AppConfig;
use receptionist::db;
use receptionist::handlers;
use receptionist::models::PracticeProfile;
use receptionist::services::ai::client::ChatLanguageModel;
use receptionist::services::ai::ollama::OllamaProvider;
use receptionist::services::ai::openai::OpenAiProvider;
use receptionist::services::ai::LlmProvider;
use receptionist::services::receptionist::Receptionist;
use receptionist::services::telephony::twilio::TwilioVoiceProvider;
use receptionist::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let profile = PracticeProfile::load(config.practice_config.as_deref())?;
    tracing::info!(
        practice = %profile.info.name,
        services = profile.services.len(),
        "loaded practice profile"
    );

    let timeout = Duration::from_secs(config.llm_timeout_secs);
    let provider: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {}, model: {})", config.ollama_url, config.ollama_model);
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
                timeout,
            )?)
        }
        _ => {
            if config.llm_api_key.is_empty() {
                tracing::warn!("LLM_API_KEY is not set, model calls will fail and fallbacks will be used");
            }
            tracing::info!("using OpenAI-compatible LLM provider (url: {}, model: {})", config.llm_base_url, config.llm_model);
            Box::new(OpenAiProvider::new(
                config.llm_base_url.clone(),
                config.llm_api_key.clone(),
                config.llm_model.clone(),
                timeout,
            )?)
        }
    };

    let telephony = TwilioVoiceProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_phone_number.clone(),
    );
    if config.twilio_auth_token.is_empty() {
        tracing::warn!("TWILIO_AUTH_TOKEN is not set, webhook signatures will not be checked");
    }

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        receptionist: Receptionist::new(profile, Arc::new(ChatLanguageModel::new(provider))),
        telephony: Box::new(telephony),
        config: config.clone(),
    });

    let app = handlers::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
