//! The device capability contract.
//!
//! The [`Device`] trait abstracts bulk file I/O so that interchangeable
//! engines can sit behind one dispatch layer:
//! - a portable positional-I/O backend with a worker-thread async engine
//! - NVMe-tuned asynchronous engines shipped as loadable modules
//!
//! Every method except [`Device::name`] has a default implementation that
//! fails with [`DeviceError::Unsupported`]. A backend overrides exactly the
//! capabilities it provides; anything else is reported, never silently
//! skipped.

use std::path::Path;

use crate::buffer::Buffer;
use crate::error::DeviceError;

/// Whether a positional transfer completes before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoMode {
    /// The call returns after the transfer (and any validation) finished.
    Sync,
    /// The call returns after submission; completion is observed via `wait`.
    Async,
}

impl IoMode {
    pub fn is_async(self) -> bool {
        self == Self::Async
    }
}

/// Abstraction over a block I/O backend.
///
/// Implementations must be shareable across threads: the dispatcher hands
/// out snapshots of the active device to concurrent callers.
pub trait Device: Send + Sync {
    /// Device type identifier, e.g. `"posix"`.
    fn name(&self) -> &str;

    /// Transfer unit in bytes.
    fn block_size(&self) -> Result<usize, DeviceError> {
        Err(DeviceError::unsupported(self.name(), "block_size"))
    }

    /// Maximum number of queued requests per worker.
    fn queue_depth(&self) -> Result<usize, DeviceError> {
        Err(DeviceError::unsupported(self.name(), "queue_depth"))
    }

    fn single_submit(&self) -> Result<bool, DeviceError> {
        Err(DeviceError::unsupported(self.name(), "single_submit"))
    }

    fn overlap_events(&self) -> Result<bool, DeviceError> {
        Err(DeviceError::unsupported(self.name(), "overlap_events"))
    }

    fn thread_count(&self) -> Result<usize, DeviceError> {
        Err(DeviceError::unsupported(self.name(), "thread_count"))
    }

    /// Reads the whole buffer from the start of `path`.
    ///
    /// Returns the number of bytes read.
    fn read(&self, buffer: &Buffer, path: &Path, validate: bool) -> Result<usize, DeviceError> {
        let _ = (buffer, path, validate);
        Err(DeviceError::unsupported(self.name(), "read"))
    }

    /// Writes the whole buffer to `path`, replacing its contents.
    ///
    /// Returns the number of bytes written.
    fn write(&self, buffer: &Buffer, path: &Path, validate: bool) -> Result<usize, DeviceError> {
        let _ = (buffer, path, validate);
        Err(DeviceError::unsupported(self.name(), "write"))
    }

    /// Positional read of `path` into `buffer`.
    ///
    /// With [`IoMode::Async`] the returned count is the number of bytes
    /// submitted; errors found during the transfer surface from `wait`.
    fn pread(
        &self,
        buffer: &Buffer,
        path: &Path,
        validate: bool,
        mode: IoMode,
    ) -> Result<usize, DeviceError> {
        let _ = (buffer, path, validate, mode);
        Err(DeviceError::unsupported(self.name(), "pread"))
    }

    /// Positional write of `buffer` to `path`.
    fn pwrite(
        &self,
        buffer: &Buffer,
        path: &Path,
        validate: bool,
        mode: IoMode,
    ) -> Result<usize, DeviceError> {
        let _ = (buffer, path, validate, mode);
        Err(DeviceError::unsupported(self.name(), "pwrite"))
    }

    /// Whole-buffer read through the asynchronous engine.
    ///
    /// Returns after submission; completion and any validation failure are
    /// reported by `wait`.
    fn aio_read(&self, buffer: &Buffer, path: &Path, validate: bool) -> Result<usize, DeviceError> {
        self.pread(buffer, path, validate, IoMode::Async)
    }

    /// Whole-buffer write through the asynchronous engine.
    fn aio_write(
        &self,
        buffer: &Buffer,
        path: &Path,
        validate: bool,
    ) -> Result<usize, DeviceError> {
        self.pwrite(buffer, path, validate, IoMode::Async)
    }

    fn sync_pread(&self, buffer: &Buffer, path: &Path) -> Result<usize, DeviceError> {
        self.pread(buffer, path, false, IoMode::Sync)
    }

    fn sync_pwrite(&self, buffer: &Buffer, path: &Path) -> Result<usize, DeviceError> {
        self.pwrite(buffer, path, false, IoMode::Sync)
    }

    fn async_pread(&self, buffer: &Buffer, path: &Path) -> Result<usize, DeviceError> {
        self.pread(buffer, path, false, IoMode::Async)
    }

    fn async_pwrite(&self, buffer: &Buffer, path: &Path) -> Result<usize, DeviceError> {
        self.pwrite(buffer, path, false, IoMode::Async)
    }

    /// Copies `src` into `dest`. Both must have the same byte length.
    fn memcpy(&self, dest: &Buffer, src: &Buffer) -> Result<usize, DeviceError> {
        let _ = (dest, src);
        Err(DeviceError::unsupported(self.name(), "memcpy"))
    }

    /// Allocates a locked buffer of `count` elements typed like `example`.
    fn new_locked_buffer(&self, count: usize, example: &Buffer) -> Result<Buffer, DeviceError> {
        let _ = (count, example);
        Err(DeviceError::unsupported(self.name(), "new_locked_buffer"))
    }

    /// Releases a buffer previously returned by `new_locked_buffer`.
    fn free_locked_buffer(&self, buffer: &Buffer) -> Result<(), DeviceError> {
        let _ = buffer;
        Err(DeviceError::unsupported(self.name(), "free_locked_buffer"))
    }

    /// Blocks until every asynchronous operation issued so far has completed.
    ///
    /// Returns the number of operations completed since the previous call,
    /// or the first transfer error observed among them.
    fn wait(&self) -> Result<usize, DeviceError> {
        Err(DeviceError::unsupported(self.name(), "wait"))
    }
}
