//! # blockio-loader: Device Resolution and Loading
//!
//! Resolves a device type string to a live [`Device`](blockio_device::Device):
//!
//! - [`DeviceRegistry`]: statically linked factories, checked first
//! - [`ModuleResolver`]: maps a type to `<root>/<type>_op.<ext>` and
//!   discovers what is installed
//! - [`DeviceLoader`]: opens modules with `libloading`, validates the
//!   exported entry, and runs the factory
//!
//! A successful load yields a [`LoadedDevice`] that owns both the device and
//! its module, dropping them in that order.

mod error;
mod loader;
mod module;
mod registry;
mod resolver;


pub use error::{RegistrationError, ResolutionError};
pub use loader::{AvailableDevice, DeviceLoader, DeviceSource, LoadedDevice};
pub use module::ModuleHandle;
pub use registry::{DeviceFactory, DeviceRegistry};
pub use resolver::{MODULE_SUFFIX, ModuleResolver, device_type_from_file_name, module_file_name};
