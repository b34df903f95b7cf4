//! # blockio-posix: Portable Block I/O Backend
//!
//! A [`Device`](blockio_device::Device) built on `std::fs` positional I/O:
//!
//! - Synchronous `pread`/`pwrite` run on the caller's thread in
//!   `block_size` steps
//! - Asynchronous transfers are split across `thread_count` worker threads,
//!   each with a `queue_depth`-slot bounded inbox
//! - Locked buffers are tracked per device instance
//!
//! The crate builds both as an `rlib` (statically registered by `blockio`)
//! and as a `cdylib`. Packaged as `<plugins-root>/posix_op.<ext>`, the
//! `cdylib` is a loadable module exporting the standard device entry.

mod completion;
mod device;
mod engine;
mod pool;
mod positional;

#[cfg(test)]
mod tests;

use blockio_device::{Device, DeviceError, DeviceSettings};

pub use device::PosixDevice;

/// Device type identifier of this backend.
pub const DEVICE_TYPE: &str = "posix";

/// Factory used both for static registration and as the module entry.
pub fn create(settings: &DeviceSettings) -> Result<Box<dyn Device>, DeviceError> {
    Ok(Box::new(PosixDevice::new(settings.clone())?))
}

blockio_device::export_device!("posix", create);
