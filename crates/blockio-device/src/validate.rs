//! Post-transfer content validation.
//!
//! Backends run this after a transfer when the caller asked for
//! `validate = true`. The file is re-read through the ordinary page-cache
//! path and compared against the buffer, independent of whatever engine
//! performed the transfer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::TransferError;

const COMPARE_CHUNK: usize = 64 * 1024;

/// Checks that the first `expected.len()` bytes of `path` equal `expected`.
///
/// Reports the offset of the first differing byte as
/// [`TransferError::ValidationMismatch`], and a file shorter than `expected`
/// as [`TransferError::ShortRead`].
pub fn verify_file_contents(path: &Path, expected: &[u8]) -> Result<(), TransferError> {
    let mut file = File::open(path).map_err(|e| TransferError::from_io(path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| TransferError::from_io(path, e))?
        .len();
    if file_len < expected.len() as u64 {
        return Err(TransferError::ShortRead {
            path: path.to_path_buf(),
            expected: expected.len() as u64,
            actual: file_len,
        });
    }

    let mut scratch = vec![0u8; COMPARE_CHUNK.min(expected.len())];
    let mut offset = 0usize;
    while offset < expected.len() {
        let n = scratch.len().min(expected.len() - offset);
        file.read_exact(&mut scratch[..n])
            .map_err(|e| TransferError::from_io(path, e))?;
        if let Some(i) = first_mismatch(&scratch[..n], &expected[offset..offset + n]) {
            return Err(TransferError::ValidationMismatch {
                path: path.to_path_buf(),
                offset: (offset + i) as u64,
            });
        }
        offset += n;
    }

    tracing::debug!(path = %path.display(), bytes = expected.len(), "validation passed");
    Ok(())
}

fn first_mismatch(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter().zip(b).position(|(x, y)| x != y)
}
