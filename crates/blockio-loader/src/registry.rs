//! Statically linked device factories.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use blockio_device::{Device, DeviceError, DeviceSettings};

use crate::error::RegistrationError;

/// Constructor for a device type.
pub type DeviceFactory =
    Arc<dyn Fn(&DeviceSettings) -> Result<Box<dyn Device>, DeviceError> + Send + Sync>;

/// Builtin factories keyed by device type.
///
/// A registered type is constructed in-process and takes precedence over a
/// module file of the same name.
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    factories: BTreeMap<String, DeviceFactory>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        device_type: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&DeviceSettings) -> Result<Box<dyn Device>, DeviceError> + Send + Sync + 'static,
    {
        let device_type = device_type.into();
        if !is_valid_device_type(&device_type) {
            return Err(RegistrationError::InvalidDeviceType(device_type));
        }
        if self.factories.contains_key(&device_type) {
            return Err(RegistrationError::AlreadyRegistered(device_type));
        }
        tracing::debug!(device_type = %device_type, "registered builtin device");
        self.factories.insert(device_type, Arc::new(factory));
        Ok(())
    }

    pub fn get(&self, device_type: &str) -> Option<&DeviceFactory> {
        self.factories.get(device_type)
    }

    pub fn contains(&self, device_type: &str) -> bool {
        self.factories.contains_key(device_type)
    }

    /// Registered device types in sorted order.
    pub fn device_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

fn is_valid_device_type(device_type: &str) -> bool {
    !device_type.is_empty()
        && device_type
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Device for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn named(settings: &DeviceSettings) -> Result<Box<dyn Device>, DeviceError> {
        let _ = settings;
        Ok(Box::new(Named("named")))
    }

    #[test]
    fn register_and_build() {
        let mut registry = DeviceRegistry::new();
        registry.register("named", named).unwrap();

        let factory = registry.get("named").unwrap();
        let device = factory(&DeviceSettings::default()).unwrap();
        assert_eq!(device.name(), "named");
        assert!(registry.contains("named"));
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = DeviceRegistry::new();
        registry.register("named", named).unwrap();
        assert_eq!(
            registry.register("named", named),
            Err(RegistrationError::AlreadyRegistered("named".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_device_types_rejected() {
        let mut registry = DeviceRegistry::new();
        for bad in ["", "Posix", "nv-me", "a/b"] {
            assert_eq!(
                registry.register(bad, named),
                Err(RegistrationError::InvalidDeviceType(bad.into()))
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn device_types_sorted() {
        let mut registry = DeviceRegistry::new();
        registry.register("zeta", named).unwrap();
        registry.register("alpha", named).unwrap();
        assert_eq!(registry.device_types().collect::<Vec<_>>(), ["alpha", "zeta"]);
    }
}
