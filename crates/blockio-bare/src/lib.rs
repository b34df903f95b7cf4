//! The `bare` device module.
//!
//! Its device implements only [`Device::name`]; every other call fails
//! through the trait defaults, from code inside the module. Tests stage the
//! `cdylib` under a plugins root to exercise module loading and unloading.
//!
//! Test crates list this crate as a dev-dependency so the `cdylib` gets
//! built, but never link it: its entry symbol would clash with the builtin
//! `posix` backend's.

use blockio_device::{Device, DeviceError, DeviceSettings};

pub const DEVICE_TYPE: &str = "bare";

#[derive(Debug, Default)]
pub struct BareDevice;

impl Device for BareDevice {
    fn name(&self) -> &str {
        DEVICE_TYPE
    }
}

pub fn create(_settings: &DeviceSettings) -> Result<Box<dyn Device>, DeviceError> {
    Ok(Box::new(BareDevice))
}

blockio_device::export_device!("bare", create);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_device_supports_nothing() {
        let device = (blockio_device_entry.create)(&DeviceSettings::default()).unwrap();
        assert_eq!(device.name(), DEVICE_TYPE);
        assert!(matches!(
            device.queue_depth(),
            Err(DeviceError::Unsupported { .. })
        ));
        assert_eq!(blockio_device_entry.device_type, DEVICE_TYPE);
    }
}
