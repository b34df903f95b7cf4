//! Configuration management for blockio
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (BLOCKIO_* prefix, `__` between sections)
//! 2. blockio.local.toml (gitignored, local overrides)
//! 3. blockio.toml (git-tracked, project config)
//! 4. ~/.config/blockio/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! ```toml
//! [plugins]
//! root = "plugins"
//!
//! [device]
//! default_type = "posix"
//!
//! [device.settings]
//! block_size = 1048576
//! queue_depth = 128
//! thread_count = 4
//!
//! [lifecycle]
//! locked_buffers = "refuse"
//! ```

use anyhow::Result;
use blockio_device::DeviceSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main blockio configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockIoConfig {
    pub plugins: PluginsConfig,
    pub device: DeviceConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory holding `<type>_op.<ext>` modules.
    pub root: PathBuf,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("plugins"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device loaded at construction. An empty string disables this.
    pub default_type: Option<String>,
    pub settings: DeviceSettings,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            default_type: Some("posix".to_string()),
            settings: DeviceSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub locked_buffers: LockedBufferPolicy,
}

/// What a device switch does when the outgoing device still has locked
/// buffers that were never freed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockedBufferPolicy {
    /// Fail the switch and keep the current device.
    #[default]
    Refuse,
    /// Switch anyway and log the leaked buffers.
    Warn,
}

impl fmt::Display for LockedBufferPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Refuse => "refuse",
            Self::Warn => "warn",
        })
    }
}

impl BlockIoConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Device type to load at construction, if any.
    pub fn default_device(&self) -> Option<&str> {
        self.device
            .default_type
            .as_deref()
            .filter(|device_type| !device_type.is_empty())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.plugins.root.is_relative() {
            self.plugins.root = base.join(&self.plugins.root);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device
            .settings
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("[device.settings] {e}")))
    }
}
