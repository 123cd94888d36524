//! Gateway main entry point
//!
//! This is the HTTP gateway that receives external requests and routes
//! them to the attendance service via InProcess calls.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_lib::{app, GatewayConfig, ServiceRouter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=info,attendance_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = GatewayConfig::from_env();
    tracing::info!("Starting Gateway v{}", config.version);
    tracing::info!("HTTP server listening on {}", config.http_addr);

    // Create service router for InProcess calls
    let router = Arc::new(ServiceRouter::with_config(config.attendance_config()));

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, app(router)).await?;

    Ok(())
}
