//! Loadable-module ABI.
//!
//! A backend module exports one static named [`DEVICE_ENTRY_SYMBOL`] of type
//! [`DeviceEntry`], normally via [`export_device!`](crate::export_device).
//! The host checks `abi_version` and `contract_version` before it calls
//! `create`.
//!
//! The entry uses Rust types (`&'static str`, `Box<dyn Device>`), so a module
//! must be built with the same toolchain and the same `blockio-device`
//! version as the host. The version check catches the second; the first is
//! a packaging requirement.

use crate::device::Device;
use crate::error::DeviceError;
use crate::settings::DeviceSettings;

/// Layout version of [`DeviceEntry`]. Bumped on any field change.
pub const DEVICE_ABI_VERSION: u32 = 1;

/// Version of this crate, embedded into every exported entry.
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// NUL-terminated name of the exported entry static.
pub const DEVICE_ENTRY_SYMBOL: &[u8] = b"blockio_device_entry\0";

/// Constructor exported by a backend module.
pub type CreateDeviceFn = fn(&DeviceSettings) -> Result<Box<dyn Device>, DeviceError>;

/// Entry point record exported by a backend module.
///
/// `abi_version` is the first field of a `repr(C)` struct so a host can read
/// it before trusting the rest of the layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DeviceEntry {
    pub abi_version: u32,
    pub contract_version: &'static str,
    pub device_type: &'static str,
    pub create: CreateDeviceFn,
}

/// Exports a [`DeviceEntry`] for a backend module.
///
/// ```ignore
/// fn create(settings: &DeviceSettings) -> Result<Box<dyn Device>, DeviceError> {
///     Ok(Box::new(MyDevice::new(settings.clone())?))
/// }
///
/// blockio_device::export_device!("mydev", create);
/// ```
#[macro_export]
macro_rules! export_device {
    ($device_type:expr, $create:path) => {
        #[allow(unsafe_code, non_upper_case_globals)]
        #[unsafe(no_mangle)]
        pub static blockio_device_entry: $crate::plugin::DeviceEntry =
            $crate::plugin::DeviceEntry {
                abi_version: $crate::plugin::DEVICE_ABI_VERSION,
                contract_version: $crate::plugin::CONTRACT_VERSION,
                device_type: $device_type,
                create: $create,
            };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_symbol_is_nul_terminated() {
        assert_eq!(DEVICE_ENTRY_SYMBOL.last(), Some(&0));
        assert_eq!(
            &DEVICE_ENTRY_SYMBOL[..DEVICE_ENTRY_SYMBOL.len() - 1],
            b"blockio_device_entry"
        );
    }
}
