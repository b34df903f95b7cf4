//! CLI command implementations.

pub mod config;
pub mod info;
pub mod io;
pub mod plugins;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context, Result};
use blockio::Trampoline;
use blockio_config::{BlockIoConfig, ConfigLoader};

/// Project and device selection shared by every command.
pub struct Target {
    pub project: PathBuf,
    pub device: Option<String>,
}

impl Target {
    pub fn config(&self) -> Result<BlockIoConfig> {
        ConfigLoader::new()
            .with_project_dir(&self.project)
            .load()
            .with_context(|| format!("Failed to load configuration from {}", self.project.display()))
    }

    /// Trampoline with the selected device loaded.
    pub fn trampoline(&self) -> Result<Trampoline> {
        let mut config = self.config()?;
        if let Some(device) = &self.device {
            config.device.default_type = Some(device.clone());
        }
        let trampoline = Trampoline::from_config(&config).context("Failed to load device")?;
        if !trampoline.is_loaded() {
            anyhow::bail!("No device selected. Pass --device or set [device] default_type.");
        }
        Ok(trampoline)
    }
}
