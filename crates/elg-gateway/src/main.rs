//! ELG Gateway
//!
//! Accepts encrypted binary geolocation requests from partner devices,
//! translates them into upstream XML lookups, and returns encrypted binary
//! responses.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use elg_common::PartnerKeys;
use elg_gateway::config::ServerConfig;
use elg_gateway::context::GatewayContext;
use elg_gateway::handlers;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("ELG Gateway v{}", env!("CARGO_PKG_VERSION"));

    let server_yaml = PathBuf::from("server.yaml");

    let config = ServerConfig::load_from_file(&server_yaml)
        .with_context(|| format!("loading {}", server_yaml.display()))?;

    let partner_keys_path = server_yaml
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .join(&config.partner_keys_path);

    let partner_keys = PartnerKeys::load_from_file(&partner_keys_path)
        .with_context(|| format!("loading {}", partner_keys_path.display()))?;

    info!(partner_count = partner_keys.len(), "partner keys loaded");

    let ctx = Arc::new(GatewayContext::new(config, partner_keys));

    let addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!("listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = handlers::handle_connection(socket, addr, ctx).await {
                        error!(%addr, error = %e, "connection failed");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection");
            }
        }
    }
}
