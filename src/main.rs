mod config;
mod openai;
mod relay;

use std::time::Duration;

use serenity::all::{Client, Http};
use tracing::info;
use tracing_subscriber::prelude::*;

use config::Config;
use relay::{CompletionGateway, RelayHandler};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "threadweaver.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            panic!("Failed to load config: {e}");
        }
    };

    // Setup logging
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        );
    let registry = tracing_subscriber::registry().with(stdout_layer);

    let _guard = if let Some(ref log_dir) = config.log_dir {
        std::fs::create_dir_all(log_dir).ok();
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("threadweaver.log"))
            .expect("Failed to open log file");
        let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(
                        tracing_subscriber::EnvFilter::from_default_env()
                            .add_directive(tracing::Level::INFO.into()),
                    ),
            )
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    };

    info!("🚀 Starting threadweaver...");
    info!("Loaded config from {config_path}");
    info!("Model: {}, max retries: {}", config.model, config.max_retries);

    // Get bot info
    let http = Http::new(&config.discord_token);
    let bot_user = match http.get_current_user().await {
        Ok(me) => me,
        Err(e) => {
            panic!("Failed to fetch bot identity: {e}");
        }
    };
    info!("Bot user ID: {}, username: {}", bot_user.id, bot_user.name);

    let mut openai_client = openai::Client::new(config.openai_api_key.clone());
    if let Some(ref base_url) = config.openai_base_url {
        openai_client = openai_client.with_base_url(base_url.clone());
    }

    let gateway = CompletionGateway {
        client: Box::new(openai_client),
        model: config.model.clone(),
        persona: config.persona.clone(),
        max_retries: config.max_retries,
        backoff_unit: Duration::from_secs(config.backoff_base_secs),
    };

    let handler = RelayHandler { bot_id: bot_user.id, gateway };

    let mut client = Client::builder(&config.discord_token, RelayHandler::intents())
        .event_handler(handler)
        .await
        .expect("Failed to create Discord client");

    if let Err(e) = client.start().await {
        panic!("Discord client error: {e}");
    }
}
