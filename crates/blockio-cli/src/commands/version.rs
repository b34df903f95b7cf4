//! Version command implementation.

use blockio_config::BlockIoConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

pub fn run() {
    println!("{NAME} {VERSION}");
    println!();
    println!("Backend-agnostic block I/O with runtime-loadable devices.");
    println!();
    println!("Build info:");
    println!("  Device ABI:   {}", blockio::plugin::DEVICE_ABI_VERSION);
    println!("  Contract:     {}", blockio::plugin::CONTRACT_VERSION);
    println!(
        "  Default type: {}",
        BlockIoConfig::default().default_device().unwrap_or("none")
    );
    println!("  Module ext:   {}", std::env::consts::DLL_EXTENSION);
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
}
