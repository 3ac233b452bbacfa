//! factibot - Entry Point
//!
//! Starts the webhook server. Platform adapters are registered only when
//! their credentials are present, so a WhatsApp-only or Telegram-only
//! deployment needs nothing extra.

use factibot::channels::{TelegramApi, WhatsAppApi};
use factibot::factiverse::FactiverseClient;
use factibot::server::{self, AppState};
use factibot::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("factibot v{}", env!("CARGO_PKG_VERSION"));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let svc = Arc::new(FactiverseClient::new(http.clone(), &config));

    let whatsapp = WhatsAppApi::from_config(http.clone(), &config);
    let telegram = TelegramApi::from_config(http, &config);
    match (&whatsapp, &telegram) {
        (None, None) => anyhow::bail!(
            "no platform adapter configured; set WHATSAPP_TOKEN/PHONE_NUMBER_ID or TELEGRAM_TOKEN"
        ),
        (wa, tg) => {
            if wa.is_some() {
                info!("whatsapp adapter enabled");
            }
            if tg.is_some() {
                info!("telegram adapter enabled");
            }
        }
    }

    let state = Arc::new(AppState::new(config.clone(), svc, whatsapp, telegram)?);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
