// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use garmin_insights_mcp::config::Config;
use garmin_insights_mcp::logging;
use garmin_insights_mcp::mcp::McpServer;
use garmin_insights_mcp::providers::create_provider;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "8080")]
    port: u16,

    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;

    let args = Args::parse();

    info!("Starting Garmin insights MCP server on port {}", args.port);

    let config = Config::load(args.config)?;

    let mut provider = create_provider(
        &config.provider.provider_type,
        config.provider.api_base_url.as_deref(),
    )?;

    match config.auth_data() {
        Some(auth_data) => {
            provider
                .authenticate(auth_data)
                .await
                .context("Provider authentication failed")?;
        }
        None => {
            warn!("No provider credentials configured; set GARMIN_TOKENS or GARMIN_TOKENS_BASE64");
        }
    }

    let server = McpServer::new(config, Arc::from(provider));
    server.run(args.port).await?;

    Ok(())
}
