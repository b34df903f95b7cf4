//! The dispatch layer holding the single active device.
//!
//! # Design
//!
//! - The active device lives in a two-state [`Slot`] behind a `RwLock`.
//!   Operations clone an `Arc` snapshot under the read lock and forward
//!   without holding it, so a slow transfer never blocks a device switch.
//! - `load_device` is serialized by `load_lock`. The new device is built
//!   outside the slot lock and swapped in under the write lock.
//! - A replaced device is drained and dropped once its last snapshot goes
//!   away. Its module is unloaded right after it.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use blockio_config::{BlockIoConfig, LockedBufferPolicy};
use blockio_device::{Buffer, Device, DeviceError, IoMode, LifecycleError};
use blockio_loader::{AvailableDevice, DeviceLoader, DeviceRegistry, LoadedDevice, ModuleResolver};
use parking_lot::{Mutex, RwLock};

use crate::error::TrampolineError;
use crate::locked::LockedSet;

type Result<T> = std::result::Result<T, TrampolineError>;

/// A device activation.
pub(crate) struct ActiveDevice {
    loaded: LoadedDevice,
    generation: u64,
    locked: LockedSet,
}

impl ActiveDevice {
    fn device(&self) -> &dyn Device {
        self.loaded.device()
    }
}

impl Drop for ActiveDevice {
    fn drop(&mut self) {
        if let Err(e) = drain(self.device()) {
            tracing::warn!(
                device_type = self.loaded.device_type(),
                generation = self.generation,
                error = %e,
                "asynchronous work failed while releasing device"
            );
        }
        let outstanding = self.locked.len();
        if outstanding > 0 {
            tracing::warn!(
                device_type = self.loaded.device_type(),
                generation = self.generation,
                outstanding,
                "device released with locked buffers still outstanding"
            );
        }
        tracing::info!(
            device_type = self.loaded.device_type(),
            generation = self.generation,
            "device released"
        );
    }
}

/// Waits for the device's asynchronous work. A device without `wait` has
/// nothing to drain.
fn drain(device: &dyn Device) -> std::result::Result<usize, DeviceError> {
    match device.wait() {
        Err(DeviceError::Unsupported { .. }) => Ok(0),
        other => other,
    }
}

enum Slot {
    Unloaded,
    Loaded(Arc<ActiveDevice>),
}

/// Builtin factories compiled into this build.
pub fn builtin_registry() -> DeviceRegistry {
    #[allow(unused_mut)]
    let mut registry = DeviceRegistry::new();
    #[cfg(feature = "builtin-posix")]
    if let Err(e) = registry.register(blockio_posix::DEVICE_TYPE, blockio_posix::create) {
        tracing::warn!(error = %e, "builtin posix device not registered");
    }
    registry
}

/// Forwards I/O to one runtime-selected device.
///
/// Every operation fails with [`TrampolineError::NoDevice`] until
/// [`load_device`](Self::load_device) succeeds.
pub struct Trampoline {
    loader: DeviceLoader,
    policy: LockedBufferPolicy,
    slot: RwLock<Slot>,
    load_lock: Mutex<()>,
    generation: AtomicU64,
}

impl Trampoline {
    /// Creates a trampoline with no active device.
    pub fn new(loader: DeviceLoader) -> Self {
        Self {
            loader,
            policy: LockedBufferPolicy::default(),
            slot: RwLock::new(Slot::Unloaded),
            load_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_locked_buffer_policy(mut self, policy: LockedBufferPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds a trampoline from configuration and loads the configured
    /// default device, if any.
    pub fn from_config(config: &BlockIoConfig) -> Result<Self> {
        let loader = DeviceLoader::new(
            ModuleResolver::new(&config.plugins.root),
            builtin_registry(),
            config.device.settings.clone(),
        );
        let trampoline =
            Self::new(loader).with_locked_buffer_policy(config.lifecycle.locked_buffers);
        if let Some(device_type) = config.default_device() {
            trampoline.load_device(device_type)?;
        }
        Ok(trampoline)
    }

    fn active(&self, operation: &'static str) -> Result<Arc<ActiveDevice>> {
        match &*self.slot.read() {
            Slot::Loaded(active) => Ok(Arc::clone(active)),
            Slot::Unloaded => Err(TrampolineError::NoDevice { operation }),
        }
    }

    /// Runs `call` against a snapshot of the active device.
    ///
    /// Errors are detached while the snapshot is still held, so they stay
    /// valid after the device's module is unloaded.
    fn forward<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce(&dyn Device) -> std::result::Result<T, DeviceError>,
    ) -> Result<T> {
        let active = self.active(operation)?;
        call(active.device()).map_err(|e| TrampolineError::Device(e.detached()))
    }

    fn current(&self) -> Option<Arc<ActiveDevice>> {
        match &*self.slot.read() {
            Slot::Loaded(active) => Some(Arc::clone(active)),
            Slot::Unloaded => None,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Makes `device_type` the active device, replacing any current one.
    ///
    /// The current device is drained first. A drain error, an outstanding
    /// locked buffer under [`LockedBufferPolicy::Refuse`], or a resolution
    /// failure leaves the current device active.
    ///
    /// The drain and the locked-buffer count do not block other callers.
    /// Work submitted or buffers allocated on the current device while a
    /// switch is in progress are the caller's to coordinate; such work is
    /// still drained when the replaced device is released.
    pub fn load_device(&self, device_type: &str) -> Result<()> {
        let _serial = self.load_lock.lock();

        if let Some(current) = self.current() {
            drain(current.device()).map_err(DeviceError::detached)?;
            let count = current.locked.len();
            if count > 0 {
                match self.policy {
                    LockedBufferPolicy::Refuse => {
                        return Err(LifecycleError::OutstandingLockedBuffers { count }.into());
                    }
                    LockedBufferPolicy::Warn => tracing::warn!(
                        device_type = current.loaded.device_type(),
                        outstanding = count,
                        "switching devices with locked buffers outstanding"
                    ),
                }
            }
        }

        let loaded = self.loader.load(device_type).inspect_err(|e| {
            tracing::debug!(device_type, error = %e, "device load failed");
        })?;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let active = Arc::new(ActiveDevice {
            loaded,
            generation,
            locked: LockedSet::default(),
        });

        let previous = std::mem::replace(&mut *self.slot.write(), Slot::Loaded(active));
        tracing::info!(device_type, generation, "device activated");
        // Dropped outside the slot lock: releasing drains the device.
        drop(previous);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&*self.slot.read(), Slot::Loaded(_))
    }

    /// Type of the active device.
    pub fn device_type(&self) -> Option<String> {
        self.current()
            .map(|active| active.loaded.device_type().to_owned())
    }

    /// Activation number of the active device, starting at 1.
    pub fn generation(&self) -> Option<u64> {
        self.current().map(|active| active.generation)
    }

    pub fn available_devices(&self) -> Vec<AvailableDevice> {
        self.loader.available_devices()
    }

    pub fn loader(&self) -> &DeviceLoader {
        &self.loader
    }

    pub fn locked_buffer_policy(&self) -> LockedBufferPolicy {
        self.policy
    }

    // ========================================================================
    // Configuration queries
    // ========================================================================

    pub fn get_block_size(&self) -> Result<usize> {
        self.forward("get_block_size", |d| d.block_size())
    }

    pub fn get_queue_depth(&self) -> Result<usize> {
        self.forward("get_queue_depth", |d| d.queue_depth())
    }

    pub fn get_single_submit(&self) -> Result<bool> {
        self.forward("get_single_submit", |d| d.single_submit())
    }

    pub fn get_overlap_events(&self) -> Result<bool> {
        self.forward("get_overlap_events", |d| d.overlap_events())
    }

    pub fn get_thread_count(&self) -> Result<usize> {
        self.forward("get_thread_count", |d| d.thread_count())
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    pub fn read(&self, buffer: &Buffer, path: impl AsRef<Path>, validate: bool) -> Result<usize> {
        self.forward("read", |d| d.read(buffer, path.as_ref(), validate))
    }

    pub fn write(&self, buffer: &Buffer, path: impl AsRef<Path>, validate: bool) -> Result<usize> {
        self.forward("write", |d| d.write(buffer, path.as_ref(), validate))
    }

    /// Whole-buffer read through the device's asynchronous engine. Call
    /// [`wait`](Self::wait) before using the buffer.
    pub fn aio_read(
        &self,
        buffer: &Buffer,
        path: impl AsRef<Path>,
        validate: bool,
    ) -> Result<usize> {
        self.forward("aio_read", |d| d.aio_read(buffer, path.as_ref(), validate))
    }

    pub fn aio_write(
        &self,
        buffer: &Buffer,
        path: impl AsRef<Path>,
        validate: bool,
    ) -> Result<usize> {
        self.forward("aio_write", |d| d.aio_write(buffer, path.as_ref(), validate))
    }

    pub fn pread(
        &self,
        buffer: &Buffer,
        path: impl AsRef<Path>,
        validate: bool,
        mode: IoMode,
    ) -> Result<usize> {
        self.forward("pread", |d| d.pread(buffer, path.as_ref(), validate, mode))
    }

    pub fn pwrite(
        &self,
        buffer: &Buffer,
        path: impl AsRef<Path>,
        validate: bool,
        mode: IoMode,
    ) -> Result<usize> {
        self.forward("pwrite", |d| d.pwrite(buffer, path.as_ref(), validate, mode))
    }

    pub fn sync_pread(&self, buffer: &Buffer, path: impl AsRef<Path>) -> Result<usize> {
        self.forward("sync_pread", |d| d.sync_pread(buffer, path.as_ref()))
    }

    pub fn sync_pwrite(&self, buffer: &Buffer, path: impl AsRef<Path>) -> Result<usize> {
        self.forward("sync_pwrite", |d| d.sync_pwrite(buffer, path.as_ref()))
    }

    pub fn async_pread(&self, buffer: &Buffer, path: impl AsRef<Path>) -> Result<usize> {
        self.forward("async_pread", |d| d.async_pread(buffer, path.as_ref()))
    }

    pub fn async_pwrite(&self, buffer: &Buffer, path: impl AsRef<Path>) -> Result<usize> {
        self.forward("async_pwrite", |d| d.async_pwrite(buffer, path.as_ref()))
    }

    pub fn memcpy(&self, dest: &Buffer, src: &Buffer) -> Result<usize> {
        self.forward("memcpy", |d| d.memcpy(dest, src))
    }

    /// Blocks until the active device has finished all asynchronous work.
    pub fn wait(&self) -> Result<usize> {
        self.forward("wait", |d| d.wait())
    }

    // ========================================================================
    // Locked buffers
    // ========================================================================

    /// Allocates a locked buffer of `count` elements typed like `example`.
    pub fn new_locked_buffer(&self, count: usize, example: &Buffer) -> Result<Buffer> {
        let active = self.active("new_locked_buffer")?;
        let buffer = active
            .device()
            .new_locked_buffer(count, example)
            .map_err(DeviceError::detached)?;
        let Some(tag) = buffer.pin_tag() else {
            tracing::warn!(
                device_type = active.loaded.device_type(),
                bytes = buffer.len(),
                "device returned an unlocked buffer from new_locked_buffer"
            );
            return Err(LifecycleError::NotLocked.into());
        };
        active.locked.insert(tag);
        Ok(buffer)
    }

    /// Releases a buffer from [`new_locked_buffer`](Self::new_locked_buffer).
    ///
    /// Only buffers allocated by the active device are accepted.
    pub fn free_locked_buffer(&self, buffer: &Buffer) -> Result<()> {
        let active = self.active("free_locked_buffer")?;
        let tag = buffer.pin_tag().ok_or(LifecycleError::NotLocked)?;
        if !active.locked.contains(tag) {
            return Err(LifecycleError::UnknownLockedBuffer { id: tag.id }.into());
        }
        active
            .device()
            .free_locked_buffer(buffer)
            .map_err(DeviceError::detached)?;
        active.locked.remove(tag);
        Ok(())
    }

    /// Locked buffers the active device has handed out and not yet freed.
    pub fn outstanding_locked_buffers(&self) -> Result<usize> {
        Ok(self.active("outstanding_locked_buffers")?.locked.len())
    }
}

impl std::fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current();
        f.debug_struct("Trampoline")
            .field(
                "device_type",
                &current.as_ref().map(|a| a.loaded.device_type()),
            )
            .field("generation", &current.as_ref().map(|a| a.generation))
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
