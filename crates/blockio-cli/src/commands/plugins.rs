//! Lists device types the loader can resolve.

use anyhow::Result;
use blockio::{DeviceLoader, DeviceSource, ModuleResolver, builtin_registry};

use super::Target;
use crate::style::{print_hint, print_table};

pub fn run(target: &Target) -> Result<()> {
    let config = target.config()?;
    let loader = DeviceLoader::new(
        ModuleResolver::new(&config.plugins.root),
        builtin_registry(),
        config.device.settings.clone(),
    );
    let devices = loader.available_devices();

    if devices.is_empty() {
        println!("No devices available.");
        print_hint(&format!(
            "Install modules as {}/<type>_op.{}",
            config.plugins.root.display(),
            std::env::consts::DLL_EXTENSION
        ));
        return Ok(());
    }

    let default = config.default_device();
    let rows: Vec<Vec<String>> = devices
        .iter()
        .map(|d| {
            let kind = match d.source {
                DeviceSource::Builtin => "builtin",
                DeviceSource::Module(_) => "module",
            };
            let marker = if Some(d.device_type.as_str()) == default { "*" } else { "" };
            vec![
                d.device_type.clone(),
                kind.to_string(),
                d.source.to_string(),
                marker.to_string(),
            ]
        })
        .collect();
    print_table(&["Device", "Kind", "Source", "Default"], &rows);
    Ok(())
}
