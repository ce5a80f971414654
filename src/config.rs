// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the insights MCP server

pub mod insights_config;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::providers::AuthData;

pub use insights_config::InsightsConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub insights: InsightsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Which provider backend serves wellness data
    pub provider_type: String,
    /// Saved OAuth token store as JSON
    pub token_store: Option<String>,
    /// The same token store base64-wrapped, handier in env files
    pub token_store_base64: Option<String>,
    /// Wellness API base URL override
    pub api_base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "garmin".to_string(),
            token_store: None,
            token_store_base64: None,
            api_base_url: None,
        }
    }
}

impl Config {
    pub fn load(path: Option<String>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| {
            dirs::config_dir()
                .map(|p| p.join("garmin-insights-mcp/config.toml"))
                .unwrap_or_else(|| "config.toml".into())
                .to_string_lossy()
                .to_string()
        });

        if Path::new(&config_path).exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            dotenv::dotenv().ok();

            let mut config = Config::default();
            config.provider.token_store = std::env::var("GARMIN_TOKENS").ok();
            config.provider.token_store_base64 = std::env::var("GARMIN_TOKENS_BASE64").ok();
            config.provider.api_base_url = std::env::var("GARMIN_API_BASE").ok();
            Ok(config)
        }
    }

    #[allow(dead_code)]
    pub fn save(&self, path: Option<String>) -> Result<()> {
        let config_path = path.unwrap_or_else(|| {
            dirs::config_dir()
                .map(|p| p.join("garmin-insights-mcp/config.toml"))
                .unwrap_or_else(|| "config.toml".into())
                .to_string_lossy()
                .to_string()
        });

        let parent = Path::new(&config_path)
            .parent()
            .context("Invalid config path")?;
        fs::create_dir_all(parent)?;

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }

    /// Credentials for the provider session, if any were configured
    ///
    /// The plain token store wins over the base64 one when both are set;
    /// the provider decodes either form.
    pub fn auth_data(&self) -> Option<AuthData> {
        if let Some(json) = &self.provider.token_store {
            return Some(AuthData::TokenStore(json.clone()));
        }
        if let Some(wrapped) = &self.provider.token_store_base64 {
            return Some(AuthData::TokenStore(wrapped.clone()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_sample_config() -> Config {
        Config {
            provider: ProviderConfig {
                provider_type: "garmin".to_string(),
                token_store: Some(r#"{"oauth2_token": {"access_token": "abc"}}"#.to_string()),
                token_store_base64: None,
                api_base_url: Some("http://localhost:9999".to_string()),
            },
            insights: InsightsConfig::default(),
        }
    }

    fn create_temp_config_file(content: &str) -> (TempDir, String) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).expect("Failed to write temp config");
        (temp_dir, config_path.to_string_lossy().to_string())
    }

    #[test]
    fn test_config_load_from_file() {
        let config_content = r#"
[provider]
provider_type = "garmin"
token_store = "{\"oauth2_token\": {\"access_token\": \"file_token\"}}"
api_base_url = "http://localhost:8765"

[insights]
week_starts_on = "sunday"

[insights.anomaly]
rhr_increase_bpm = 4.0
"#;
        let (_temp_dir, config_path) = create_temp_config_file(config_content);
        let config = Config::load(Some(config_path)).expect("Failed to load config");

        assert_eq!(config.provider.provider_type, "garmin");
        assert!(config
            .provider
            .token_store
            .as_deref()
            .unwrap()
            .contains("file_token"));
        assert_eq!(
            config.provider.api_base_url.as_deref(),
            Some("http://localhost:8765")
        );
        assert_eq!(config.insights.week_starts_on, "sunday");
        assert_eq!(config.insights.anomaly.rhr_increase_bpm, 4.0);
        // Untouched sections keep their defaults.
        assert_eq!(config.insights.anomaly.baseline_window_days, 14);
        assert_eq!(config.insights.readiness.sleep, 30.0);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let (_temp_dir, config_path) = create_temp_config_file("this is not valid toml [[[");
        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_save_round_trip() {
        let config = create_sample_config();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let config_path_str = config_path.to_string_lossy().to_string();

        config
            .save(Some(config_path_str.clone()))
            .expect("Failed to save config");
        assert!(config_path.exists());

        let loaded = Config::load(Some(config_path_str)).expect("Failed to load saved config");
        assert_eq!(loaded.provider.token_store, config.provider.token_store);
        assert_eq!(loaded.provider.api_base_url, config.provider.api_base_url);
    }

    #[test]
    fn test_auth_data_prefers_plain_token_store() {
        let mut config = create_sample_config();
        config.provider.token_store_base64 = Some("d2hhdGV2ZXI=".to_string());
        match config.auth_data() {
            Some(AuthData::TokenStore(raw)) => assert!(raw.starts_with('{')),
            other => panic!("unexpected auth data: {:?}", other),
        }

        config.provider.token_store = None;
        match config.auth_data() {
            Some(AuthData::TokenStore(raw)) => assert_eq!(raw, "d2hhdGV2ZXI="),
            other => panic!("unexpected auth data: {:?}", other),
        }

        config.provider.token_store_base64 = None;
        assert!(config.auth_data().is_none());
    }
}
