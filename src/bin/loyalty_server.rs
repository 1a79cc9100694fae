//! loyalty-server: Loyalty points ledger gRPC server
//!
//! Serves the admin/reporting operations (account summaries, leaderboards,
//! redemptions, adjustments, settings) and ingests order completions, either
//! inline (`CompleteOrder`) or through the in-process bus
//! (`PublishOrderCompleted`).
//!
//! ## Configuration
//! - `config.yaml`, `--config <path>` or LOYALTY_CONFIG: YAML configuration file
//! - LOYALTY__SERVER__PORT, LOYALTY__STORAGE__TYPE, ...: per-key overrides
//! - LOYALTY_LOG: tracing filter (default "info")

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tonic_health::server::health_reporter;
use tracing::{error, info};

use loyalty_ledger::bus::OrderCompletionBus;
use loyalty_ledger::config::Config;
use loyalty_ledger::handlers::LoyaltyLedgerHandler;
use loyalty_ledger::interfaces::StaticDirectory;
use loyalty_ledger::proto::loyalty_ledger_server::LoyaltyLedgerServer;
use loyalty_ledger::services::LoyaltyService;
use loyalty_ledger::storage::init_storage;
use loyalty_ledger::transport::grpc_trace_layer;
use loyalty_ledger::utils::retry::backoff_from_config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    loyalty_ledger::utils::bootstrap::init_tracing();

    let config_path = loyalty_ledger::utils::bootstrap::parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting loyalty-server");

    let (ledger_store, settings_store) = init_storage(&config.storage, &config.retry).await?;
    info!("Storage initialized");

    // Display names come from the external registry; none is wired here.
    let directory = Arc::new(StaticDirectory::new());

    let service = Arc::new(LoyaltyService::new(
        ledger_store,
        settings_store,
        directory,
        config.accrual.clone(),
    ));

    let seeded = service.seed_default_settings(&config.accrual).await?;
    if !seeded.is_empty() {
        info!(keys = ?seeded, "Seeded accrual settings");
    }

    let bus = Arc::new(
        OrderCompletionBus::with_accrual(
            &config.bus,
            backoff_from_config(&config.retry),
            service.accrual(),
        )
        .await,
    );

    let (mut health_reporter, health_service) = health_reporter();
    health_reporter
        .set_serving::<LoyaltyLedgerServer<LoyaltyLedgerHandler>>()
        .await;

    let addr: SocketAddr = config.server.bind_address().parse()?;
    info!(address = %addr, "Loyalty ledger listening");

    Server::builder()
        .layer(grpc_trace_layer())
        .add_service(health_service)
        .add_service(LoyaltyLedgerServer::new(LoyaltyLedgerHandler::new(
            service, bus,
        )))
        .serve_with_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
