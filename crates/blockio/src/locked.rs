//! Locked buffers handed out through the trampoline, per active device.

use std::collections::HashSet;

use blockio_device::PinTag;
use parking_lot::Mutex;

/// Tags of locked buffers allocated and not yet freed.
#[derive(Debug, Default)]
pub(crate) struct LockedSet {
    tags: Mutex<HashSet<PinTag>>,
}

impl LockedSet {
    pub(crate) fn insert(&self, tag: PinTag) {
        self.tags.lock().insert(tag);
    }

    pub(crate) fn contains(&self, tag: PinTag) -> bool {
        self.tags.lock().contains(&tag)
    }

    pub(crate) fn remove(&self, tag: PinTag) -> bool {
        self.tags.lock().remove(&tag)
    }

    pub(crate) fn len(&self) -> usize {
        self.tags.lock().len()
    }
}
