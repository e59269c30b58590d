use std::path::PathBuf;
use thiserror::Error;

/// Profile loading and validation failures.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("profile not found: {0}")]
    NotFound(PathBuf),

    #[error("unknown operating mode '{0}' (expected normal, high_stress or emergency)")]
    UnknownMode(String),

    #[error("thresholds.{mode}.{field} must be positive, got {value}")]
    InvalidThreshold {
        mode: &'static str,
        field: &'static str,
        value: f64,
    },

    #[error("thresholds.{mode}.{field} makes gestures harder than the calmer mode")]
    NotMonotonic {
        mode: &'static str,
        field: &'static str,
    },

    #[error("patterns.{field}: {reason}")]
    InvalidPattern {
        field: &'static str,
        reason: String,
    },

    #[error("screen size must be positive, got {width}x{height}")]
    InvalidScreen { width: f32, height: f32 },

    #[error("binding '{key}' has invalid action '{action}'")]
    InvalidBinding { key: String, action: String },

    #[error("binding '{0}' uses cmd: but allow_commands=false")]
    CommandsDisabled(String),

    #[error("empty binding key")]
    EmptyBindingKey,
}
