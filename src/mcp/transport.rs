//! Transport layer for the query service.

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing::info;

use crate::mcp::ClimaqlServer;

/// Run the query service over stdio until the peer disconnects.
pub async fn run_stdio(server: ClimaqlServer) -> Result<()> {
    info!("starting query service on stdio");

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    info!("query service shutting down");
    Ok(())
}
