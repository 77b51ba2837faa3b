//! Runtime configuration
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [runtime]
//! max_init_depth = 256
//! max_objects = 1000000
//!
//! [reflect]
//! allow_bypass = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default limit on nested class initialization
pub const DEFAULT_MAX_INIT_DEPTH: usize = 256;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A limit that would make the runtime unusable
    #[error("Invalid limit {name} = {value}")]
    InvalidLimit {
        /// Option name
        name: &'static str,
        /// Rejected value
        value: usize,
    },
}

/// Resource limits for a runtime
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceLimits {
    /// Maximum nesting of class initializations on one thread
    pub max_init_depth: usize,

    /// Maximum number of live heap objects (None = unlimited)
    pub max_objects: Option<usize>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_init_depth: DEFAULT_MAX_INIT_DEPTH,
            max_objects: None,
        }
    }
}

impl ResourceLimits {
    /// Create unlimited resource limits
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Create resource limits with a heap object cap
    pub fn with_object_limit(max_objects: usize) -> Self {
        Self {
            max_objects: Some(max_objects),
            ..Default::default()
        }
    }
}

/// `[reflect]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReflectOptions {
    /// Whether access-bypass tokens may be granted at all
    pub allow_bypass: bool,
}

impl Default for ReflectOptions {
    fn default() -> Self {
        Self { allow_bypass: true }
    }
}

/// Options for creating a [`Runtime`](crate::Runtime)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Resource limits
    #[serde(rename = "runtime")]
    pub limits: ResourceLimits,

    /// Reflection settings
    pub reflect: ReflectOptions,
}

impl RuntimeOptions {
    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Options with specific resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    /// Reject limits no class could be initialized under
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_init_depth == 0 {
            return Err(ConfigError::InvalidLimit {
                name: "max_init_depth",
                value: 0,
            });
        }
        Ok(())
    }

    /// Disallow minting access-bypass tokens
    pub fn deny_bypass(mut self) -> Self {
        self.reflect.allow_bypass = false;
        self
    }
}
