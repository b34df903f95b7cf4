//! Registry of locked buffers handed out by one device instance.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use blockio_device::{Buffer, ElementType, LifecycleError, PinTag, TransferError};
use parking_lot::Mutex;

/// Process-wide counter so every device instance gets a distinct pool id.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub(crate) struct LockedPool {
    pool: u64,
    next_id: AtomicU64,
    live: Mutex<HashSet<u64>>,
}

impl LockedPool {
    pub(crate) fn new() -> Self {
        Self {
            pool: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            next_id: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
        }
    }

    /// Allocates and registers a buffer. Nothing is registered if the
    /// allocation fails.
    pub(crate) fn allocate(
        &self,
        element_type: ElementType,
        count: usize,
    ) -> Result<Buffer, TransferError> {
        let tag = PinTag {
            pool: self.pool,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let buffer = Buffer::new_locked(element_type, count, tag)?;
        self.live.lock().insert(tag.id);
        Ok(buffer)
    }

    pub(crate) fn release(&self, buffer: &Buffer) -> Result<(), LifecycleError> {
        let tag = buffer.pin_tag().ok_or(LifecycleError::NotLocked)?;
        if tag.pool != self.pool {
            return Err(LifecycleError::ForeignLockedBuffer {
                id: tag.id,
                owner: tag.pool,
                pool: self.pool,
            });
        }
        if self.live.lock().remove(&tag.id) {
            Ok(())
        } else {
            Err(LifecycleError::UnknownLockedBuffer { id: tag.id })
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.live.lock().len()
    }
}

impl Drop for LockedPool {
    fn drop(&mut self) {
        let outstanding = self.live.get_mut().len();
        if outstanding > 0 {
            tracing::warn!(
                pool = self.pool,
                outstanding,
                "locked buffers were never freed before device teardown"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_release() {
        let pool = LockedPool::new();
        let buf = pool.allocate(ElementType::F16, 8).unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(pool.outstanding(), 1);

        pool.release(&buf).unwrap();
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn failed_allocation_registers_nothing() {
        let pool = LockedPool::new();
        assert!(matches!(
            pool.allocate(ElementType::F32, usize::MAX / 2),
            Err(TransferError::InvalidBuffer(_))
        ));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn double_release_is_unknown() {
        let pool = LockedPool::new();
        let buf = pool.allocate(ElementType::U8, 1).unwrap();
        pool.release(&buf).unwrap();
        assert!(matches!(
            pool.release(&buf),
            Err(LifecycleError::UnknownLockedBuffer { .. })
        ));
    }

    #[test]
    fn foreign_and_ordinary_buffers_rejected() {
        let a = LockedPool::new();
        let b = LockedPool::new();
        let from_a = a.allocate(ElementType::U8, 4).unwrap();

        assert!(matches!(
            b.release(&from_a),
            Err(LifecycleError::ForeignLockedBuffer { .. })
        ));
        assert!(matches!(
            b.release(&Buffer::zeroed(ElementType::U8, 4)),
            Err(LifecycleError::NotLocked)
        ));
        assert_eq!(a.outstanding(), 1);
        a.release(&from_a).unwrap();
    }
}
