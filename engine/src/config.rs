//! Engine Configuration
//!
//! Loaded from `UAM_*` environment variables or deserialized from the
//! host's own configuration.

use serde::Deserialize;

/// Settings that shape access resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether membership is inherited along term and post hierarchies
    pub lock_recursive: bool,
    /// Whether post authors always have access to their own posts
    pub authors_has_access_to_own: bool,
    /// Capability that grants access on preview requests
    pub manage_capability: String,
    /// Role whose holders have access to every object
    pub full_access_role: String,
    /// Prefix for cache provider keys (e.g., "uam")
    pub cache_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_recursive: true,
            authors_has_access_to_own: true,
            manage_capability: "manage_user_groups".to_string(),
            full_access_role: "administrator".to_string(),
            cache_prefix: "uam".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UAM_LOCK_RECURSIVE`: Inherit membership through hierarchies (default: true)
    /// - `UAM_AUTHORS_HAS_ACCESS_TO_OWN`: Authors see their own posts (default: true)
    /// - `UAM_MANAGE_CAPABILITY`: Preview override capability (default: "manage_user_groups")
    /// - `UAM_FULL_ACCESS_ROLE`: Role with access to everything (default: "administrator")
    /// - `UAM_CACHE_PREFIX`: Cache key prefix (default: "uam")
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("UAM_LOCK_RECURSIVE") {
            config.lock_recursive = parse_bool(&val).unwrap_or(true);
        }
        if let Ok(val) = std::env::var("UAM_AUTHORS_HAS_ACCESS_TO_OWN") {
            config.authors_has_access_to_own = parse_bool(&val).unwrap_or(true);
        }
        if let Ok(val) = std::env::var("UAM_MANAGE_CAPABILITY") {
            if !val.trim().is_empty() {
                config.manage_capability = val.trim().to_string();
            }
        }
        if let Ok(val) = std::env::var("UAM_FULL_ACCESS_ROLE") {
            if !val.trim().is_empty() {
                config.full_access_role = val.trim().to_string();
            }
        }
        if let Ok(val) = std::env::var("UAM_CACHE_PREFIX") {
            config.cache_prefix = val.trim().to_string();
        }

        config
    }

    /// Full cache key for one of the engine's well-known keys.
    pub fn cache_key(&self, key: &str) -> String {
        if self.cache_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.cache_prefix)
        }
    }
}

/// Parses "true/false", "1/0" and "yes/no".
fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
