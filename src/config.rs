// In: src/config.rs

//! The single source of truth for all asperity construction-time policy.
//!
//! This module defines the unified `CoreConfig` struct, which is designed to be
//! created once at the application boundary (e.g., from a user's YAML file)
//! and then passed down through the system via a shared, read-only
//! `Arc<CoreConfig>`.

use serde::{Deserialize, Serialize};

use crate::types::DetrendMode;

/// Defines how the bridge reacts when a caller-supplied physical size
/// disagrees with one recorded in the metadata map handed over by a reader.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SizeMismatchPolicy {
    /// **Default:** Log a warning and keep the caller-supplied value. This is
    /// a soft inconsistency; the caller always knows best.
    #[default]
    Warn,

    /// Keep the caller-supplied value without logging anything.
    Silent,

    /// Treat the mismatch as an error and refuse to build the entity.
    Strict,
}

/// The single, unified configuration for entity construction.
/// This struct is created once and shared throughout the system via an `Arc`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CoreConfig {
    /// Reaction to conflicting physical sizes between caller and metadata.
    #[serde(default)]
    pub size_mismatch: SizeMismatchPolicy,

    /// The detrend mode used when a boundary request does not name one.
    #[serde(default)]
    pub default_detrend_mode: DetrendMode,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            size_mismatch: SizeMismatchPolicy::default(),
            default_detrend_mode: DetrendMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes_from_empty_object() {
        let config: CoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.size_mismatch, SizeMismatchPolicy::Warn);
        assert_eq!(config.default_detrend_mode, DetrendMode::Height);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = CoreConfig {
            size_mismatch: SizeMismatchPolicy::Strict,
            default_detrend_mode: DetrendMode::Curvature,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
