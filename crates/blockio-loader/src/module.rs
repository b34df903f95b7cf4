//! Shared-library device modules.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blockio_device::plugin::{
    CONTRACT_VERSION, DEVICE_ABI_VERSION, DEVICE_ENTRY_SYMBOL, DeviceEntry,
};
use libloading::{Library, Symbol};

use crate::error::ResolutionError;
use crate::loader::ValidatedFactory;
use crate::registry::DeviceFactory;

/// What backs a loaded device.
pub enum ModuleHandle {
    /// Statically linked factory from the registry.
    Builtin,
    /// Shared library opened from the plugins root. Unloaded on drop.
    Dynamic { path: PathBuf, library: Library },
}

impl ModuleHandle {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }

    /// File the module was opened from, for dynamic modules.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Builtin => None,
            Self::Dynamic { path, .. } => Some(path),
        }
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("Builtin"),
            Self::Dynamic { path, .. } => f.debug_struct("Dynamic").field("path", path).finish(),
        }
    }
}

/// Opens the module at `path` and validates its device entry.
///
/// The returned factory calls into the library, so it must not outlive the
/// returned handle. On any failure the library is closed before returning.
#[allow(unsafe_code)]
pub(crate) fn open(
    device_type: &str,
    path: &Path,
) -> Result<(ValidatedFactory, ModuleHandle), ResolutionError> {
    // SAFETY: opening runs the library's initializers. Modules under the
    // plugins root are trusted code built against this host.
    let library = unsafe { Library::new(path) }.map_err(|source| ResolutionError::ModuleOpen {
        device_type: device_type.to_owned(),
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(device_type, path = %path.display(), "opened device module");

    let entry = {
        // SAFETY: `export_device!` defines this symbol as a `DeviceEntry`
        // static. The symbol address is the address of that static.
        let symbol: Symbol<'_, *const DeviceEntry> = unsafe { library.get(DEVICE_ENTRY_SYMBOL) }
            .map_err(|source| ResolutionError::MissingEntryPoint {
                device_type: device_type.to_owned(),
                path: path.to_path_buf(),
                source,
            })?;
        let raw = *symbol;

        // SAFETY: `DeviceEntry` is `repr(C)` with `abi_version` first, so
        // this field is readable before the rest of the layout is trusted.
        check_abi(device_type, path, unsafe { (*raw).abi_version })?;
        // SAFETY: the ABI version matches, so the layout is this host's.
        unsafe { *raw }
    };
    check_contract(device_type, path, &entry)?;

    if entry.device_type != device_type {
        tracing::warn!(
            device_type,
            exported = entry.device_type,
            path = %path.display(),
            "module exports a different device type than its file name"
        );
    }
    tracing::debug!(device_type, "resolved device entry");

    let create: DeviceFactory = Arc::new(entry.create);
    Ok((
        ValidatedFactory::new(device_type, create),
        ModuleHandle::Dynamic {
            path: path.to_path_buf(),
            library,
        },
    ))
}

fn check_abi(device_type: &str, path: &Path, found: u32) -> Result<(), ResolutionError> {
    if found == DEVICE_ABI_VERSION {
        return Ok(());
    }
    Err(ResolutionError::AbiMismatch {
        device_type: device_type.to_owned(),
        path: path.to_path_buf(),
        expected: DEVICE_ABI_VERSION,
        found,
    })
}

fn check_contract(
    device_type: &str,
    path: &Path,
    entry: &DeviceEntry,
) -> Result<(), ResolutionError> {
    if entry.contract_version == CONTRACT_VERSION {
        return Ok(());
    }
    Err(ResolutionError::ContractMismatch {
        device_type: device_type.to_owned(),
        path: path.to_path_buf(),
        expected: CONTRACT_VERSION,
        found: entry.contract_version.to_owned(),
    })
}
