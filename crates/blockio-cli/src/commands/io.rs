//! `write` and `read` commands.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use blockio::{Buffer, ElementType, IoMode};

use super::Target;
use crate::style::print_success;

pub struct TransferOptions {
    pub element_type: ElementType,
    pub validate: bool,
    pub asynchronous: bool,
}

impl TransferOptions {
    fn mode(&self) -> IoMode {
        if self.asynchronous {
            IoMode::Async
        } else {
            IoMode::Sync
        }
    }
}

/// Parses `4096`, `64K`, `16M` or `2G` (binary multiples).
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, shift) = match s.char_indices().last() {
        Some((i, 'k' | 'K')) => (&s[..i], 10),
        Some((i, 'm' | 'M')) => (&s[..i], 20),
        Some((i, 'g' | 'G')) => (&s[..i], 30),
        _ => (s, 0),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size '{s}': expected a number with optional K, M or G"))?;
    value
        .checked_mul(1 << shift)
        .ok_or_else(|| format!("size '{s}' is too large"))
}

fn element_count(bytes: u64, element_type: ElementType) -> Result<usize> {
    let stride = element_type.size() as u64;
    if bytes % stride != 0 {
        anyhow::bail!("{bytes} bytes is not a whole number of {element_type} elements");
    }
    usize::try_from(bytes / stride).context("Size does not fit in memory")
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn write(target: &Target, file: &Path, size: u64, options: &TransferOptions) -> Result<()> {
    let count = element_count(size, options.element_type)?;
    let trampoline = target.trampoline()?;
    let buffer = Buffer::try_zeroed(options.element_type, count)?;
    buffer.fill_from(&pattern(buffer.len()))?;

    let started = Instant::now();
    trampoline.pwrite(&buffer, file, options.validate, options.mode())?;
    if options.asynchronous {
        trampoline.wait()?;
    }
    let elapsed = started.elapsed();

    print_success(&format!(
        "Wrote {} bytes to {} in {:.3}s",
        buffer.len(),
        file.display(),
        elapsed.as_secs_f64()
    ));
    Ok(())
}

pub fn read(target: &Target, file: &Path, options: &TransferOptions) -> Result<()> {
    let size = std::fs::metadata(file)
        .with_context(|| format!("Cannot stat {}", file.display()))?
        .len();
    let count = element_count(size, options.element_type)?;
    let trampoline = target.trampoline()?;
    let buffer = Buffer::try_zeroed(options.element_type, count)?;

    let started = Instant::now();
    trampoline.pread(&buffer, file, options.validate, options.mode())?;
    if options.asynchronous {
        trampoline.wait()?;
    }
    let elapsed = started.elapsed();

    print_success(&format!(
        "Read {} bytes ({count} x {}) from {} in {:.3}s",
        buffer.len(),
        options.element_type,
        file.display(),
        elapsed.as_secs_f64()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_with_suffixes() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("64K"), Ok(65_536));
        assert_eq!(parse_size("16m"), Ok(16 * 1024 * 1024));
        assert_eq!(parse_size("2G"), Ok(2 * 1024 * 1024 * 1024));
        assert!(parse_size("lots").is_err());
        assert!(parse_size("K").is_err());
        assert!(parse_size(&format!("{}G", u64::MAX)).is_err());
    }

    #[test]
    fn element_count_requires_whole_elements() {
        assert_eq!(element_count(16, ElementType::F32).unwrap(), 4);
        assert!(element_count(10, ElementType::F64).is_err());
    }
}
