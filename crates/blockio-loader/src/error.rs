//! Loader error types.

use std::path::PathBuf;

use blockio_device::DeviceError;

/// Why a device type could not be turned into a live device.
///
/// Every variant is recoverable: the caller's current device, if any, is
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The module file is missing or is not a loadable library.
    #[error("cannot open module for device `{device_type}` at {path}: {source}")]
    ModuleOpen {
        device_type: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// The module opened but does not export the device entry.
    #[error("module {path} for device `{device_type}` has no device entry: {source}")]
    MissingEntryPoint {
        device_type: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("module {path} uses device ABI {found}, host expects {expected}")]
    AbiMismatch {
        device_type: String,
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("module {path} was built against blockio-device {found}, host uses {expected}")]
    ContractMismatch {
        device_type: String,
        path: PathBuf,
        expected: &'static str,
        found: String,
    },

    /// The factory ran and returned an error.
    #[error("device `{device_type}` failed to initialize: {source}")]
    Construction {
        device_type: String,
        #[source]
        source: DeviceError,
    },

    /// The factory panicked.
    #[error("device `{device_type}` panicked during initialization: {message}")]
    FactoryPanicked {
        device_type: String,
        message: String,
    },
}

impl ResolutionError {
    /// The device type whose resolution failed.
    pub fn device_type(&self) -> &str {
        match self {
            Self::ModuleOpen { device_type, .. }
            | Self::MissingEntryPoint { device_type, .. }
            | Self::AbiMismatch { device_type, .. }
            | Self::ContractMismatch { device_type, .. }
            | Self::Construction { device_type, .. }
            | Self::FactoryPanicked { device_type, .. } => device_type,
        }
    }
}

/// Errors registering a builtin factory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("device type `{0}` is already registered")]
    AlreadyRegistered(String),

    /// Device types name module files, so they are restricted to
    /// lowercase ASCII letters, digits and underscores.
    #[error("invalid device type `{0}`: use lowercase letters, digits and underscores")]
    InvalidDeviceType(String),
}
