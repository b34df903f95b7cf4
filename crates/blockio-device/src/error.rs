//! Device error types.

use std::path::PathBuf;

/// Errors returned by a [`Device`](crate::Device).
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The backend does not implement this capability.
    #[error("operation `{operation}` is not supported by the `{device}` device")]
    Unsupported { device: String, operation: String },

    /// A read, write, copy or validation failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A locked buffer was misused.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Backend settings were rejected at construction time.
    #[error("invalid device settings: {0}")]
    InvalidSettings(String),

    /// The backend could not acquire a resource it needs (threads, queues).
    #[error("backend failure: {0}")]
    Backend(String),
}

impl DeviceError {
    /// Shorthand for [`DeviceError::Unsupported`].
    pub fn unsupported(device: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            device: device.into(),
            operation: operation.into(),
        }
    }

    /// Rebuilds the error so it holds no data owned by the code that raised
    /// it.
    ///
    /// An `std::io::Error` can point at static messages or vtables inside the
    /// library that created it. Errors leaving a loadable module are detached
    /// before the module may be unloaded.
    pub fn detached(self) -> Self {
        match self {
            Self::Transfer(e) => Self::Transfer(e.detached()),
            other => other,
        }
    }
}

/// Failures moving bytes between buffers and files.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Underlying OS I/O error.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// The file ended before the buffer was filled.
    #[error("short read from {path}: expected {expected} bytes, file has {actual}")]
    ShortRead {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Fewer bytes reached the file than the buffer holds.
    #[error("short write to {path}: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Post-transfer validation found differing content.
    #[error("validation failed for {path}: first mismatch at byte {offset}")]
    ValidationMismatch { path: PathBuf, offset: u64 },

    /// Two buffers that must be the same size are not.
    #[error("buffer length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A buffer could not be constructed as requested.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),
}

impl TransferError {
    /// See [`DeviceError::detached`].
    pub fn detached(self) -> Self {
        match self {
            Self::Io { path, source } => Self::Io {
                path,
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            other => other,
        }
    }

    /// Maps an `std::io::Error` to the matching transfer error for `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// Misuse of the locked-buffer lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The buffer was never allocated as a locked buffer.
    #[error("buffer is not a locked buffer")]
    NotLocked,

    /// The locked buffer belongs to a different pool.
    #[error("locked buffer {id} belongs to pool {owner}, not pool {pool}")]
    ForeignLockedBuffer { id: u64, owner: u64, pool: u64 },

    /// The locked buffer is not live (already freed, or never registered here).
    #[error("locked buffer {id} is not registered with the active device")]
    UnknownLockedBuffer { id: u64 },

    /// The device still has locked buffers that were never freed.
    #[error("{count} locked buffer(s) still outstanding on the active device")]
    OutstandingLockedBuffers { count: usize },
}
