//! Typed, shareable I/O buffers.
//!
//! A [`Buffer`] is a cheap-clone handle to a fixed-length byte region tagged
//! with an [`ElementType`]. Backends keep a clone for the lifetime of an
//! asynchronous transfer, so the region outlives the request even if the
//! caller drops its own handle early.
//!
//! Locked (pinned) buffers additionally carry a [`PinTag`] naming the pool
//! that allocated them. Only the allocating backend can release them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// Element type of a buffer. Determines the stride in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    F16,
    Bf16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 | Self::F16 | Self::Bf16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::F16 => "f16",
            Self::Bf16 => "bf16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F64 => "f64",
        }
    }

    pub const ALL: [ElementType; 12] = [
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::F16,
        Self::Bf16,
        Self::U32,
        Self::I32,
        Self::F32,
        Self::U64,
        Self::I64,
        Self::F64,
    ];
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown element type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown element type: {0}")]
pub struct ParseElementTypeError(String);

impl FromStr for ElementType {
    type Err = ParseElementTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseElementTypeError(s.to_string()))
    }
}

/// Identifies a locked buffer within the pool that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinTag {
    /// Pool (one per backend instance) that owns the registration.
    pub pool: u64,
    /// Buffer id, unique within the pool.
    pub id: u64,
}

/// Shared handle to a typed, fixed-length memory region.
#[derive(Clone)]
pub struct Buffer {
    inner: Arc<Inner>,
}

struct Inner {
    element_type: ElementType,
    len: usize,
    pin: Option<PinTag>,
    storage: RwLock<Vec<u8>>,
}

impl Buffer {
    /// Creates an ordinary zero-filled buffer of `count` elements.
    ///
    /// # Panics
    ///
    /// Panics if the byte length overflows or cannot be allocated, like
    /// `Vec::with_capacity`. Use [`try_zeroed`](Self::try_zeroed) for sizes
    /// that come from outside the program.
    pub fn zeroed(element_type: ElementType, count: usize) -> Self {
        Self::build(element_type, vec![0; count * element_type.size()], None)
    }

    /// Fallible form of [`zeroed`](Self::zeroed).
    pub fn try_zeroed(element_type: ElementType, count: usize) -> Result<Self, TransferError> {
        Ok(Self::build(element_type, zeroed_storage(element_type, count)?, None))
    }

    /// Creates an ordinary buffer holding a copy of `data`.
    ///
    /// `data.len()` must be a multiple of the element stride.
    pub fn from_bytes(element_type: ElementType, data: &[u8]) -> Result<Self, TransferError> {
        if data.len() % element_type.size() != 0 {
            return Err(TransferError::InvalidBuffer(format!(
                "{} bytes is not a whole number of {element_type} elements",
                data.len()
            )));
        }
        Ok(Self::build(element_type, data.to_vec(), None))
    }

    /// Creates a zero-filled locked buffer registered under `tag`.
    ///
    /// Intended for backends implementing `new_locked_buffer`. Fails with
    /// [`TransferError::InvalidBuffer`] when `count` elements do not fit in
    /// memory.
    pub fn new_locked(
        element_type: ElementType,
        count: usize,
        tag: PinTag,
    ) -> Result<Self, TransferError> {
        Ok(Self::build(
            element_type,
            zeroed_storage(element_type, count)?,
            Some(tag),
        ))
    }

    fn build(element_type: ElementType, storage: Vec<u8>, pin: Option<PinTag>) -> Self {
        Self {
            inner: Arc::new(Inner {
                element_type,
                len: storage.len(),
                pin,
                storage: RwLock::new(storage),
            }),
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.inner.element_type
    }

    /// Bytes per element.
    pub fn stride(&self) -> usize {
        self.inner.element_type.size()
    }

    pub fn element_count(&self) -> usize {
        self.inner.len / self.stride()
    }

    /// Length in bytes. Fixed for the lifetime of the buffer.
    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    pub fn is_locked(&self) -> bool {
        self.inner.pin.is_some()
    }

    pub fn pin_tag(&self) -> Option<PinTag> {
        self.inner.pin
    }

    /// Returns true if both handles point at the same region.
    pub fn same_region(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Borrows the contents for reading.
    pub fn bytes(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.inner.storage.read(), Vec::as_slice)
    }

    /// Borrows the contents for writing.
    pub fn bytes_mut(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.inner.storage.write(), Vec::as_mut_slice)
    }

    /// Snapshot of the current contents.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.bytes())
    }

    /// Overwrites the contents with `data`, which must match the length.
    pub fn fill_from(&self, data: &[u8]) -> Result<(), TransferError> {
        if data.len() != self.len() {
            return Err(TransferError::LengthMismatch {
                expected: self.len(),
                actual: data.len(),
            });
        }
        self.bytes_mut().copy_from_slice(data);
        Ok(())
    }

    /// Copies the contents of `src` into this buffer.
    ///
    /// Locks are taken in address order so two opposing copies between the
    /// same pair of buffers cannot deadlock.
    pub fn copy_from(&self, src: &Buffer) -> Result<usize, TransferError> {
        if src.len() != self.len() {
            return Err(TransferError::LengthMismatch {
                expected: self.len(),
                actual: src.len(),
            });
        }
        if self.same_region(src) {
            return Ok(self.len());
        }

        let dst_addr = Arc::as_ptr(&self.inner) as usize;
        let src_addr = Arc::as_ptr(&src.inner) as usize;
        if dst_addr < src_addr {
            let mut dst = self.inner.storage.write();
            let from = src.inner.storage.read();
            dst.as_mut_slice().copy_from_slice(from.as_slice());
        } else {
            let from = src.inner.storage.read();
            let mut dst = self.inner.storage.write();
            dst.as_mut_slice().copy_from_slice(from.as_slice());
        }
        Ok(self.len())
    }
}

fn zeroed_storage(element_type: ElementType, count: usize) -> Result<Vec<u8>, TransferError> {
    let len = count.checked_mul(element_type.size()).ok_or_else(|| {
        TransferError::InvalidBuffer(format!(
            "{count} {element_type} elements overflow the address space"
        ))
    })?;
    let mut storage = Vec::new();
    storage.try_reserve_exact(len).map_err(|e| {
        TransferError::InvalidBuffer(format!("cannot allocate {len} bytes: {e}"))
    })?;
    storage.resize(len, 0);
    Ok(storage)
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("element_type", &self.inner.element_type)
            .field("len", &self.inner.len)
            .field("pin", &self.inner.pin)
            .finish_non_exhaustive()
    }
}
