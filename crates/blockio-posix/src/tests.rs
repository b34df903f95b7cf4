//! Backend-level tests through the exported entry and the `Device` trait.

use std::sync::Arc;
use std::thread;

use blockio_device::plugin::{CONTRACT_VERSION, DEVICE_ABI_VERSION};
use blockio_device::{Buffer, Device, DeviceError, DeviceSettings, ElementType, IoMode};

use crate::{DEVICE_TYPE, blockio_device_entry, create};

fn settings() -> DeviceSettings {
    DeviceSettings {
        block_size: 8192,
        queue_depth: 4,
        single_submit: false,
        overlap_events: true,
        thread_count: 4,
    }
}

// ============================================================================
// Exported entry
// ============================================================================

#[test]
fn entry_describes_posix_backend() {
    let entry = blockio_device_entry;
    assert_eq!(entry.abi_version, DEVICE_ABI_VERSION);
    assert_eq!(entry.contract_version, CONTRACT_VERSION);
    assert_eq!(entry.device_type, DEVICE_TYPE);
}

#[test]
fn entry_create_builds_working_device() {
    let device = (blockio_device_entry.create)(&settings()).unwrap();
    assert_eq!(device.name(), "posix");
    assert_eq!(device.block_size().unwrap(), 8192);
    assert_eq!(device.thread_count().unwrap(), 4);
}

#[test]
fn create_rejects_zero_threads() {
    let result = create(&DeviceSettings {
        thread_count: 0,
        ..settings()
    });
    assert!(matches!(result, Err(DeviceError::InvalidSettings(_))));
}

// ============================================================================
// Transfers
// ============================================================================

#[test]
fn async_write_then_wait_then_sync_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.bin");
    let device = create(&settings()).unwrap();

    let values: Vec<u8> = (0..65_536u32).flat_map(|v| v.to_le_bytes()).collect();
    let src = Buffer::from_bytes(ElementType::U32, &values).unwrap();
    assert_eq!(src.element_count(), 65_536);

    device.async_pwrite(&src, &path).unwrap();
    assert_eq!(device.wait().unwrap(), 1);

    let dst = Buffer::zeroed(ElementType::U32, 65_536);
    assert_eq!(device.sync_pread(&dst, &path).unwrap(), values.len());
    assert_eq!(&dst.bytes()[..], &values[..]);
}

#[test]
fn validated_round_trip_for_every_element_type() {
    let dir = tempfile::tempdir().unwrap();
    let device = create(&settings()).unwrap();

    for ty in ElementType::ALL {
        let path = dir.path().join(format!("{ty}.bin"));
        let src = Buffer::zeroed(ty, 3_000);
        src.fill_from(&vec![0x3C; src.len()]).unwrap();

        device.pwrite(&src, &path, true, IoMode::Sync).unwrap();
        let dst = Buffer::zeroed(ty, 3_000);
        device.pread(&dst, &path, true, IoMode::Async).unwrap();
        device.wait().unwrap();
        assert_eq!(dst.to_bytes(), src.to_bytes(), "element type {ty}");
    }
}

#[test]
fn pwrite_replaces_longer_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replace.bin");
    std::fs::write(&path, vec![0xFF; 50_000]).unwrap();
    let device = create(&settings()).unwrap();

    let src = Buffer::from_bytes(ElementType::U8, b"short").unwrap();
    device.write(&src, &path, true).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"short");
}

#[test]
fn concurrent_submitters_share_one_device() {
    let dir = tempfile::tempdir().unwrap();
    let device: Arc<dyn Device> = Arc::from(create(&settings()).unwrap());

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let device = Arc::clone(&device);
            let path = dir.path().join(format!("thread-{i}.bin"));
            thread::spawn(move || {
                let src = Buffer::from_bytes(ElementType::U8, &vec![i; 20_000]).unwrap();
                device.async_pwrite(&src, &path).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(device.wait().unwrap(), 4);
    for i in 0..4u8 {
        let written = std::fs::read(dir.path().join(format!("thread-{i}.bin"))).unwrap();
        assert!(written.iter().all(|&b| b == i));
        assert_eq!(written.len(), 20_000);
    }
}
