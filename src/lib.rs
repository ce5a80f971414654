// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Garmin Insights MCP Server
//!
//! A Model Context Protocol (MCP) server that turns the daily wellness
//! signals of a Garmin account into higher-level insights: period summaries,
//! metric trends, anomaly flags, readiness breakdowns, data completeness
//! reports, hydration targets, and coaching cues.
//!
//! ## Features
//!
//! - **Natural date handling**: tools accept explicit dates or relative
//!   phrases like "last week" and "past 30 days"
//! - **Tri-state signals**: every metric distinguishes present, absent, and
//!   zero, so missing device days never skew averages
//! - **Personal baselines**: anomalies and HRV readiness compare against the
//!   account's own history, not population norms
//! - **MCP protocol**: standard tool interface for Claude and other AI
//!   assistants
//!
//! ## Quick Start
//!
//! 1. Export a saved Garmin token store via `GARMIN_TOKENS` (or
//!    `GARMIN_TOKENS_BASE64`)
//! 2. Start the server with `garmin-insights-mcp`
//! 3. Connect from Claude or other MCP clients
//!
//! ## Architecture
//!
//! The server follows a modular architecture:
//! - **Providers**: the wellness provider abstraction and its Garmin
//!   implementation
//! - **Models**: daily records, signal structs, and activities
//! - **Intelligence**: date resolution, fetching, and the insight engines
//! - **MCP**: Model Context Protocol server implementation
//! - **Config**: configuration management and analysis tunables
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use garmin_insights_mcp::config::Config;
//! use garmin_insights_mcp::mcp::McpServer;
//! use garmin_insights_mcp::providers::create_provider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load(None)?;
//!
//!     // Create and authenticate the provider
//!     let mut provider = create_provider(&config.provider.provider_type, None)?;
//!     if let Some(auth_data) = config.auth_data() {
//!         provider.authenticate(auth_data).await?;
//!     }
//!
//!     // Serve the insight tools
//!     McpServer::new(config, Arc::from(provider)).run(8080).await
//! }
//! ```

/// Wellness provider implementations and the provider abstraction
pub mod providers;

/// Common data models for daily wellness signals and activities
pub mod models;

/// Configuration management and analysis tunables
pub mod config;

/// Model Context Protocol server implementation
pub mod mcp;

/// Date resolution, signal fetching, and the insight engines
pub mod intelligence;

/// Production logging and structured output
pub mod logging;
