//! Caller-facing error type.

use blockio_device::{DeviceError, LifecycleError};
use blockio_loader::ResolutionError;

/// Broad classification of a [`TrampolineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested device could not be loaded.
    Resolution,
    /// No device is active.
    NoDevice,
    /// The active device does not implement the operation.
    Unsupported,
    /// Moving, copying or validating bytes failed.
    Transfer,
    /// Locked-buffer misuse.
    Lifecycle,
    /// The device rejected its settings or lost a resource it needs.
    Backend,
}

impl ErrorKind {
    /// Whether the caller can recover by changing what it asks for:
    /// another device type, or loading one first.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Resolution | Self::NoDevice)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrampolineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// `operation` names the call that was attempted. It is kept out of the
    /// message so every operation reports the same text.
    #[error("no device is loaded; call load_device first")]
    NoDevice { operation: &'static str },

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl TrampolineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolution(_) => ErrorKind::Resolution,
            Self::NoDevice { .. } => ErrorKind::NoDevice,
            Self::Lifecycle(_) | Self::Device(DeviceError::Lifecycle(_)) => ErrorKind::Lifecycle,
            Self::Device(DeviceError::Unsupported { .. }) => ErrorKind::Unsupported,
            Self::Device(DeviceError::Transfer(_)) => ErrorKind::Transfer,
            Self::Device(DeviceError::InvalidSettings(_) | DeviceError::Backend(_)) => {
                ErrorKind::Backend
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use blockio_device::TransferError;

    use super::*;

    #[test]
    fn kinds_follow_source() {
        assert_eq!(
            TrampolineError::NoDevice { operation: "wait" }.kind(),
            ErrorKind::NoDevice
        );
        assert_eq!(
            TrampolineError::from(DeviceError::unsupported("posix", "memcpy")).kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            TrampolineError::from(DeviceError::from(TransferError::LengthMismatch {
                expected: 1,
                actual: 2
            }))
            .kind(),
            ErrorKind::Transfer
        );
        assert_eq!(
            TrampolineError::from(DeviceError::from(LifecycleError::NotLocked)).kind(),
            ErrorKind::Lifecycle
        );
        assert_eq!(
            TrampolineError::from(LifecycleError::OutstandingLockedBuffers { count: 2 }).kind(),
            ErrorKind::Lifecycle
        );
    }

    #[test]
    fn no_device_text_is_operation_independent() {
        let a = TrampolineError::NoDevice { operation: "read" };
        let b = TrampolineError::NoDevice {
            operation: "get_block_size",
        };
        assert_eq!(a.to_string(), b.to_string());
        assert!(a.is_retryable());
    }

    #[test]
    fn only_resolution_and_no_device_are_retryable() {
        assert!(ErrorKind::Resolution.is_retryable());
        assert!(ErrorKind::NoDevice.is_retryable());
        assert!(!ErrorKind::Transfer.is_retryable());
        assert!(!ErrorKind::Lifecycle.is_retryable());
        assert!(!ErrorKind::Unsupported.is_retryable());
    }
}
