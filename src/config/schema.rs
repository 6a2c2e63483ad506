//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::agent::permlink::PermlinkStrategy;

/// Root configuration for the publish agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Condenser API settings (endpoints, timeouts, chain id).
    pub api: ApiConfig,

    /// Image host settings.
    pub image_host: ImageHostConfig,

    /// Publish defaults (app id, parent permlink fallback, permlink strategy).
    pub publish: PublishConfig,
}

/// Condenser API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Primary API endpoint.
    pub endpoint: String,

    /// Failover endpoints, tried in order when the primary fails.
    pub failover_endpoints: Vec<String>,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Chain id as a 64-character hex string (all zeros on Steem mainnet).
    pub chain_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.steemit.com".to_string(),
            failover_endpoints: Vec::new(),
            timeout_secs: 30,
            chain_id: "0".repeat(64),
        }
    }
}

/// Image host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageHostConfig {
    /// Upload endpoint.
    pub endpoint: String,

    /// Upload timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://steemitimages.com/api/upload".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Publish defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Application identifier embedded in `json_metadata`.
    pub app_id: String,

    /// Parent permlink used when a post has no tags.
    pub default_parent_permlink: String,

    /// Permlink derivation strategy for new posts.
    pub permlink_strategy: PermlinkStrategy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            app_id: "steemit-agent/0.1.0".to_string(),
            default_parent_permlink: "steemit".to_string(),
            permlink_strategy: PermlinkStrategy::Slug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.api.endpoint, "https://api.steemit.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.chain_id.len(), 64);
        assert_eq!(config.publish.default_parent_permlink, "steemit");
        assert_eq!(config.publish.permlink_strategy, PermlinkStrategy::Slug);
    }

    #[test]
    fn test_minimal_toml() {
        let config: AgentConfig = toml::from_str(
            r#"
            [api]
            endpoint = "https://api.steemitdev.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.endpoint, "https://api.steemitdev.com");
        // Unspecified sections fall back to defaults
        assert_eq!(config.image_host.endpoint, "https://steemitimages.com/api/upload");
        assert_eq!(config.publish.app_id, "steemit-agent/0.1.0");
    }

    #[test]
    fn test_permlink_strategy_parses() {
        let config: AgentConfig = toml::from_str(
            r#"
            [publish]
            permlink_strategy = "timestamp"
            "#,
        )
        .unwrap();
        assert_eq!(config.publish.permlink_strategy, PermlinkStrategy::Timestamp);
    }
}
