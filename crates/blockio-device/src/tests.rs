//! Crate-level tests for the device contract.

use std::path::Path;

use proptest::prelude::*;

use crate::plugin::{CONTRACT_VERSION, DEVICE_ABI_VERSION};
use crate::validate::verify_file_contents;
use crate::{Buffer, Device, DeviceError, DeviceSettings, ElementType, TransferError};

// ============================================================================
// Exported Entry
// ============================================================================

struct Echo {
    block_size: usize,
}

impl Device for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn block_size(&self) -> Result<usize, DeviceError> {
        Ok(self.block_size)
    }
}

fn create_echo(settings: &DeviceSettings) -> Result<Box<dyn Device>, DeviceError> {
    settings.validate()?;
    Ok(Box::new(Echo {
        block_size: settings.block_size,
    }))
}

crate::export_device!("echo", create_echo);

#[test]
fn exported_entry_describes_module() {
    let entry = blockio_device_entry;
    assert_eq!(entry.abi_version, DEVICE_ABI_VERSION);
    assert_eq!(entry.contract_version, CONTRACT_VERSION);
    assert_eq!(entry.device_type, "echo");

    let settings = DeviceSettings {
        block_size: 8192,
        ..DeviceSettings::default()
    };
    let device = (entry.create)(&settings).unwrap();
    assert_eq!(device.name(), "echo");
    assert_eq!(device.block_size().unwrap(), 8192);
    assert!(matches!(
        device.queue_depth(),
        Err(DeviceError::Unsupported { .. })
    ));
}

#[test]
fn exported_entry_propagates_settings_errors() {
    let settings = DeviceSettings {
        thread_count: 0,
        ..DeviceSettings::default()
    };
    assert!(matches!(
        (blockio_device_entry.create)(&settings),
        Err(DeviceError::InvalidSettings(_))
    ));
}

// ============================================================================
// Validation Properties
// ============================================================================

proptest! {
    /// Property: a single flipped byte is reported at exactly its offset.
    #[test]
    fn prop_validation_pinpoints_corruption(
        data in proptest::collection::vec(any::<u8>(), 1..20_000),
        seed in any::<usize>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prop.bin");
        std::fs::write(&path, &data).unwrap();

        let corrupt_at = seed % data.len();
        let mut expected = data.clone();
        expected[corrupt_at] ^= 0xFF;

        match verify_file_contents(&path, &expected) {
            Err(TransferError::ValidationMismatch { offset, .. }) => {
                prop_assert_eq!(offset, corrupt_at as u64);
            }
            other => prop_assert!(false, "expected mismatch, got {:?}", other),
        }
    }
}

#[test]
fn validation_of_buffer_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("buffer.bin");
    let buf = Buffer::from_bytes(ElementType::F32, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    std::fs::write(&path, buf.to_bytes()).unwrap();

    verify_file_contents(Path::new(&path), &buf.bytes()).unwrap();
}
