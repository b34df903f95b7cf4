//! # blockio: Pluggable Block I/O
//!
//! One interface for moving large buffers to and from files, with the I/O
//! engine chosen at runtime:
//!
//! ```text
//!            caller
//!              │
//!      ┌───────┴────────┐
//!      │   Trampoline   │  NoDevice until load_device succeeds
//!      └───────┬────────┘
//!              │ load_device("posix")
//!      ┌───────┴────────┐
//!      │  DeviceLoader  │  builtin registry, then <root>/<type>_op.<ext>
//!      └───────┬────────┘
//!              │
//!      ┌───────┴────────┐
//!      │  dyn Device    │  posix (builtin) or a loaded module
//!      └────────────────┘
//! ```
//!
//! ```no_run
//! use blockio::{BlockIoConfig, Buffer, ElementType, Trampoline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let trampoline = Trampoline::from_config(&BlockIoConfig::load()?)?;
//! let buffer = Buffer::zeroed(ElementType::F32, 1 << 20);
//! trampoline.async_pwrite(&buffer, "checkpoint.bin")?;
//! trampoline.wait()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `builtin-posix` (default): registers the portable `posix` backend.

mod error;
mod locked;
mod trampoline;


pub use blockio_config::{BlockIoConfig, LockedBufferPolicy};
pub use blockio_device::plugin;
pub use blockio_device::{
    Buffer, Device, DeviceError, DeviceSettings, ElementType, IoMode, LifecycleError, PinTag,
    TransferError,
};
pub use blockio_loader::{
    AvailableDevice, DeviceLoader, DeviceRegistry, DeviceSource, ModuleResolver, ResolutionError,
};
pub use error::{ErrorKind, TrampolineError};
pub use trampoline::{Trampoline, builtin_registry};
