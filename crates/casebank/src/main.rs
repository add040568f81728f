//! Casebank Service Binary
//!
//! Hosts a case bank and serves its telemetry API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casebank::{
    config::CaseBankConfig,
    http::{router, ApiState, ProcessTelemetry},
    CaseBank, CASEBANK_VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Casebank Service v{}", CASEBANK_VERSION);

    // Load configuration
    let config = CaseBankConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let bank = Arc::new(CaseBank::new(&config));
    let telemetry = Arc::new(ProcessTelemetry::new());

    info!(
        "Storage config: max_cases={}, age_penalty={}, page_size={}",
        config.storage.max_cases, config.storage.age_penalty, config.storage.page_size
    );
    info!(
        "Stats config: success_threshold={}, window_size={}",
        config.stats.success_threshold, config.stats.window_size
    );
    info!(
        "Retrieval config: metric={}, state_dim={}",
        config.retrieval.metric, config.retrieval.state_dim
    );

    let app = router(ApiState {
        bank,
        telemetry,
        page_size: config.storage.page_size,
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Telemetry API listening on {}", addr);
    info!("");
    info!("Available endpoints:");
    info!("  - GET /casebank");
    info!("  - GET /casebank/stats");
    info!("  - GET /health");
    info!("  - GET /version");
    info!("");

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Shutting down Casebank service");
    Ok(())
}
