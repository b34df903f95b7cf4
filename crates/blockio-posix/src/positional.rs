//! Positional file I/O and transfer planning.

use std::fs::File;
use std::io;
use std::ops::Range;
use std::path::Path;

use blockio_device::{Buffer, TransferError};

/// Direction of a transfer relative to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// File into buffer.
    Read,
    /// Buffer into file.
    Write,
}

/// Splits `0..len` into the byte ranges that become individual jobs.
///
/// With `single_submit` every block is its own job. Otherwise the blocks are
/// divided into at most `workers` contiguous runs of near-equal size.
pub(crate) fn plan_jobs(
    len: usize,
    block_size: usize,
    workers: usize,
    single_submit: bool,
) -> Vec<Range<usize>> {
    debug_assert!(block_size > 0 && workers > 0);
    if len == 0 {
        return Vec::new();
    }

    let blocks = len.div_ceil(block_size);
    if single_submit {
        return (0..blocks)
            .map(|b| b * block_size..((b + 1) * block_size).min(len))
            .collect();
    }

    let runs = workers.min(blocks);
    let per_run = blocks / runs;
    let extra = blocks % runs;
    let mut jobs = Vec::with_capacity(runs);
    let mut start_block = 0;
    for run in 0..runs {
        let count = per_run + usize::from(run < extra);
        let end_block = start_block + count;
        jobs.push(start_block * block_size..(end_block * block_size).min(len));
        start_block = end_block;
    }
    jobs
}

/// Moves `range` of `buffer` to or from the same offsets of `file`, one
/// block at a time.
pub(crate) fn transfer_range(
    direction: Direction,
    buffer: &Buffer,
    file: &File,
    path: &Path,
    range: Range<usize>,
    block_size: usize,
) -> Result<(), TransferError> {
    match direction {
        Direction::Read => {
            let mut scratch = vec![0u8; block_size.min(range.len())];
            let mut offset = range.start;
            while offset < range.end {
                let n = block_size.min(range.end - offset);
                read_exact_at(file, &mut scratch[..n], offset as u64)
                    .map_err(|e| short_read_or_io(path, e, range.end as u64, offset as u64))?;
                buffer.bytes_mut()[offset..offset + n].copy_from_slice(&scratch[..n]);
                offset += n;
            }
        }
        Direction::Write => {
            let mut offset = range.start;
            while offset < range.end {
                let n = block_size.min(range.end - offset);
                let data = buffer.bytes();
                write_all_at(file, &data[offset..offset + n], offset as u64).map_err(|e| {
                    if e.kind() == io::ErrorKind::WriteZero {
                        TransferError::ShortWrite {
                            path: path.to_path_buf(),
                            expected: range.end as u64,
                            actual: offset as u64,
                        }
                    } else {
                        TransferError::from_io(path, e)
                    }
                })?;
                offset += n;
            }
        }
    }
    Ok(())
}

fn short_read_or_io(path: &Path, e: io::Error, expected: u64, actual: u64) -> TransferError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TransferError::ShortRead {
            path: path.to_path_buf(),
            expected,
            actual,
        }
    } else {
        TransferError::from_io(path, e)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
