//! Turns a device type into a live device.
//!
//! Resolution order:
//! 1. A builtin factory registered under the device type.
//! 2. The module file at [`ModuleResolver::module_path`].
//!
//! Nothing here touches an already active device. A failed load is
//! reported and the caller keeps whatever it had.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use blockio_device::{Device, DeviceSettings};

use crate::error::ResolutionError;
use crate::module::{self, ModuleHandle};
use crate::registry::{DeviceFactory, DeviceRegistry};
use crate::resolver::ModuleResolver;

/// A factory whose origin has been checked.
///
/// Builtin factories are trusted by registration. Module factories are only
/// wrapped after the entry's ABI and contract versions match.
pub(crate) struct ValidatedFactory {
    device_type: String,
    create: DeviceFactory,
}

impl ValidatedFactory {
    pub(crate) fn new(device_type: &str, create: DeviceFactory) -> Self {
        Self {
            device_type: device_type.to_owned(),
            create,
        }
    }

    /// Runs the factory, converting errors and panics into resolution errors.
    pub(crate) fn instantiate(
        &self,
        settings: &DeviceSettings,
    ) -> Result<Box<dyn Device>, ResolutionError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.create)(settings))) {
            Ok(Ok(device)) => Ok(device),
            // Detached so the error outlives a module that fails to load.
            Ok(Err(source)) => Err(ResolutionError::Construction {
                device_type: self.device_type.clone(),
                source: source.detached(),
            }),
            Err(payload) => Err(ResolutionError::FactoryPanicked {
                device_type: self.device_type.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl fmt::Debug for ValidatedFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedFactory")
            .field("device_type", &self.device_type)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// A device together with the module that provides its code.
pub struct LoadedDevice {
    // Declared first so it drops before `module`.
    device: Box<dyn Device>,
    module: ModuleHandle,
    device_type: String,
}

impl LoadedDevice {
    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn module(&self) -> &ModuleHandle {
        &self.module
    }
}

impl fmt::Debug for LoadedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedDevice")
            .field("device_type", &self.device_type)
            .field("device", &self.device.name())
            .field("module", &self.module)
            .finish()
    }
}

/// Where an available device type comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSource {
    Builtin,
    Module(PathBuf),
}

impl fmt::Display for DeviceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("builtin"),
            Self::Module(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableDevice {
    pub device_type: String,
    pub source: DeviceSource,
}

/// Resolves and instantiates devices.
#[derive(Debug, Clone)]
pub struct DeviceLoader {
    resolver: ModuleResolver,
    registry: DeviceRegistry,
    settings: DeviceSettings,
}

impl DeviceLoader {
    pub fn new(resolver: ModuleResolver, registry: DeviceRegistry, settings: DeviceSettings) -> Self {
        Self {
            resolver,
            registry,
            settings,
        }
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Settings passed to every factory.
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Resolves `device_type` and constructs a device.
    pub fn load(&self, device_type: &str) -> Result<LoadedDevice, ResolutionError> {
        let (factory, module) = match self.registry.get(device_type) {
            Some(create) => {
                tracing::debug!(device_type, "using builtin device");
                (
                    ValidatedFactory::new(device_type, DeviceFactory::clone(create)),
                    ModuleHandle::Builtin,
                )
            }
            None => {
                let path = self.resolver.module_path(device_type);
                module::open(device_type, &path)?
            }
        };

        // `factory` may point into `module`; it is dropped first.
        let device = factory.instantiate(&self.settings)?;
        drop(factory);
        Ok(LoadedDevice {
            device,
            module,
            device_type: device_type.to_owned(),
        })
    }

    /// Builtin and discovered device types, sorted. A builtin shadows a
    /// module file with the same type.
    pub fn available_devices(&self) -> Vec<AvailableDevice> {
        let mut devices: Vec<AvailableDevice> = self
            .registry
            .device_types()
            .map(|device_type| AvailableDevice {
                device_type: device_type.to_owned(),
                source: DeviceSource::Builtin,
            })
            .collect();
        for device_type in self.resolver.discover() {
            if !self.registry.contains(&device_type) {
                let path = self.resolver.module_path(&device_type);
                devices.push(AvailableDevice {
                    device_type,
                    source: DeviceSource::Module(path),
                });
            }
        }
        devices.sort_by(|a, b| a.device_type.cmp(&b.device_type));
        devices
    }
}
