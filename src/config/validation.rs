//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits sane)
//! - Check endpoint URLs and the chain id format
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::AgentConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "api.endpoint").
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = value.parse::<url::Url>() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!("invalid URL '{}': {}", value, e),
        });
    }
}

/// Validate an [`AgentConfig`], collecting every failure.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "api.endpoint", &config.api.endpoint);
    for (i, endpoint) in config.api.failover_endpoints.iter().enumerate() {
        check_url(&mut errors, &format!("api.failover_endpoints[{}]", i), endpoint);
    }
    check_url(&mut errors, "image_host.endpoint", &config.image_host.endpoint);

    if config.api.timeout_secs == 0 {
        errors.push(ValidationError {
            field: "api.timeout_secs".to_string(),
            message: "timeout must be greater than zero".to_string(),
        });
    }
    if config.image_host.timeout_secs == 0 {
        errors.push(ValidationError {
            field: "image_host.timeout_secs".to_string(),
            message: "timeout must be greater than zero".to_string(),
        });
    }

    let chain_id = &config.api.chain_id;
    if chain_id.len() != 64 || !chain_id.chars().all(|c| c.is_ascii_hexdigit()) {
        errors.push(ValidationError {
            field: "api.chain_id".to_string(),
            message: "chain id must be a 64-character hex string".to_string(),
        });
    }

    if config.publish.default_parent_permlink.is_empty() {
        errors.push(ValidationError {
            field: "publish.default_parent_permlink".to_string(),
            message: "fallback parent permlink must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
