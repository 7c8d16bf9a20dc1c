use std::sync::Arc;

use tracing::info;
use tracing_subscriber::prelude::*;

use wanibot::config::Config;
use wanibot::dialogue::Interpreter;
use wanibot::messenger::MessengerClient;
use wanibot::registry::SubscriberRegistry;
use wanibot::scheduler::Scheduler;
use wanibot::wanikani::WaniKaniClient;
use wanibot::webhook::{self, AppState};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wanibot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("wanibot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
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

    info!("🚀 Starting wanibot...");
    info!("Loaded config from {config_path}");

    let registry = Arc::new(SubscriberRegistry::new());
    let wanikani = Arc::new(WaniKaniClient::new());
    let sink = Arc::new(MessengerClient::new(config.page_access_token.clone()));

    Scheduler::new(registry.clone(), wanikani.clone(), sink.clone()).spawn();

    let state = Arc::new(AppState {
        verify_token: config.verify_token.clone(),
        interpreter: Interpreter::new(wanikani, registry),
        sink,
    });

    let app = webhook::router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind webhook port");
    info!("Webhook listening on {addr}");
    axum::serve(listener, app).await.expect("Webhook server failed");
}
