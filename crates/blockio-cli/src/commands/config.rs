//! Configuration management commands.

use anyhow::Result;

use super::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
    Toml,
}

/// Show the merged configuration.
pub fn show(target: &Target, format: Format) -> Result<()> {
    let config = target.config()?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        Format::Toml => println!("{}", toml::to_string_pretty(&config)?),
        Format::Text => {
            println!("blockio Configuration");
            println!("=====================\n");

            println!("Plugins:");
            println!("  Root: {}", config.plugins.root.display());
            println!();

            let settings = &config.device.settings;
            println!("Device:");
            println!("  Default type: {}", config.default_device().unwrap_or("none"));
            println!("  Block size: {}", settings.block_size);
            println!("  Queue depth: {}", settings.queue_depth);
            println!("  Single submit: {}", settings.single_submit);
            println!("  Overlap events: {}", settings.overlap_events);
            println!("  Threads: {}", settings.thread_count);
            println!();

            println!("Lifecycle:");
            println!("  Locked buffers: {}", config.lifecycle.locked_buffers);
        }
    }

    Ok(())
}
