//! Positional-I/O device using `std::fs`.
//!
//! Synchronous transfers run on the calling thread, one block at a time.
//! Asynchronous transfers are split into jobs and handed to the worker
//! [`Engine`]; `wait` drains its completion tracker.

use std::fs::{File, OpenOptions};
use std::path::Path;

use blockio_device::{Buffer, Device, DeviceError, DeviceSettings, IoMode, TransferError};

use crate::DEVICE_TYPE;
use crate::engine::{Engine, Operation};
use crate::pool::LockedPool;
use crate::positional::Direction;

/// Portable block I/O device.
pub struct PosixDevice {
    settings: DeviceSettings,
    engine: Engine,
    pool: LockedPool,
}

impl PosixDevice {
    /// Creates a device and starts its worker threads.
    pub fn new(settings: DeviceSettings) -> Result<Self, DeviceError> {
        settings.validate()?;
        let engine = Engine::start(&settings)?;
        tracing::debug!(
            block_size = settings.block_size,
            queue_depth = settings.queue_depth,
            threads = settings.thread_count,
            "posix device started"
        );
        Ok(Self {
            settings,
            engine,
            pool: LockedPool::new(),
        })
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Locked buffers allocated by this device and not yet freed.
    pub fn outstanding_locked_buffers(&self) -> usize {
        self.pool.outstanding()
    }

    /// Asynchronous operations submitted and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.engine.completion().in_flight()
    }

    fn prepare(
        &self,
        direction: Direction,
        buffer: &Buffer,
        path: &Path,
        validate: bool,
    ) -> Result<Operation, TransferError> {
        let file = match direction {
            Direction::Read => open_for_read(buffer, path)?,
            Direction::Write => open_for_write(buffer, path)?,
        };
        Ok(Operation {
            direction,
            buffer: buffer.clone(),
            file,
            path: path.to_path_buf(),
            validate,
            block_size: self.settings.block_size,
        })
    }

    fn transfer(
        &self,
        direction: Direction,
        buffer: &Buffer,
        path: &Path,
        validate: bool,
        mode: IoMode,
    ) -> Result<usize, DeviceError> {
        let op = self.prepare(direction, buffer, path, validate)?;
        match mode {
            IoMode::Sync => {
                op.run_inline()?;
                Ok(buffer.len())
            }
            IoMode::Async => Ok(self.engine.submit(op)),
        }
    }
}

fn open_for_read(buffer: &Buffer, path: &Path) -> Result<File, TransferError> {
    let file = File::open(path).map_err(|e| TransferError::from_io(path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| TransferError::from_io(path, e))?
        .len();
    if file_len < buffer.len() as u64 {
        return Err(TransferError::ShortRead {
            path: path.to_path_buf(),
            expected: buffer.len() as u64,
            actual: file_len,
        });
    }
    Ok(file)
}

fn open_for_write(buffer: &Buffer, path: &Path) -> Result<File, TransferError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| TransferError::from_io(path, e))?;
    file.set_len(buffer.len() as u64)
        .map_err(|e| TransferError::from_io(path, e))?;
    Ok(file)
}

impl Device for PosixDevice {
    fn name(&self) -> &str {
        DEVICE_TYPE
    }

    fn block_size(&self) -> Result<usize, DeviceError> {
        Ok(self.settings.block_size)
    }

    fn queue_depth(&self) -> Result<usize, DeviceError> {
        Ok(self.settings.queue_depth)
    }

    fn single_submit(&self) -> Result<bool, DeviceError> {
        Ok(self.settings.single_submit)
    }

    fn overlap_events(&self) -> Result<bool, DeviceError> {
        Ok(self.settings.overlap_events)
    }

    fn thread_count(&self) -> Result<usize, DeviceError> {
        Ok(self.engine.worker_count())
    }

    fn read(&self, buffer: &Buffer, path: &Path, validate: bool) -> Result<usize, DeviceError> {
        self.transfer(Direction::Read, buffer, path, validate, IoMode::Sync)
    }

    fn write(&self, buffer: &Buffer, path: &Path, validate: bool) -> Result<usize, DeviceError> {
        self.transfer(Direction::Write, buffer, path, validate, IoMode::Sync)
    }

    fn pread(
        &self,
        buffer: &Buffer,
        path: &Path,
        validate: bool,
        mode: IoMode,
    ) -> Result<usize, DeviceError> {
        self.transfer(Direction::Read, buffer, path, validate, mode)
    }

    fn pwrite(
        &self,
        buffer: &Buffer,
        path: &Path,
        validate: bool,
        mode: IoMode,
    ) -> Result<usize, DeviceError> {
        self.transfer(Direction::Write, buffer, path, validate, mode)
    }

    fn memcpy(&self, dest: &Buffer, src: &Buffer) -> Result<usize, DeviceError> {
        Ok(dest.copy_from(src)?)
    }

    fn new_locked_buffer(&self, count: usize, example: &Buffer) -> Result<Buffer, DeviceError> {
        Ok(self.pool.allocate(example.element_type(), count)?)
    }

    fn free_locked_buffer(&self, buffer: &Buffer) -> Result<(), DeviceError> {
        Ok(self.pool.release(buffer)?)
    }

    fn wait(&self) -> Result<usize, DeviceError> {
        Ok(self.engine.completion().drain()?)
    }
}
