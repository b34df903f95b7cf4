//! # blockio-test-harness: Staging Loadable Modules
//!
//! Loader and trampoline tests load real shared libraries. [`stage_module`]
//! copies a `cdylib` built into the target directory into a plugins root
//! under its `<device-type>_op` file name.
//!
//! The test crate must list the module's package as a dev-dependency so
//! cargo builds the `cdylib` before the tests run.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{env, fs};

/// Library name of the `bare` module's `cdylib`.
pub const BARE_LIBRARY: &str = "blockio_bare";

/// Library name of the `posix` backend's `cdylib`.
pub const POSIX_LIBRARY: &str = "blockio_posix";

/// Copies the `cdylib` named `library` (crate name with underscores) into
/// `root` as the module file for `device_type`.
///
/// The artifact is looked up next to the running test executable, in
/// `target/<profile>/deps` and `target/<profile>`. The newest match wins.
pub fn stage_module(library: &str, root: &Path, device_type: &str) -> io::Result<PathBuf> {
    let artifact = find_artifact(library)?;
    fs::create_dir_all(root)?;
    let staged = root.join(format!(
        "{device_type}_op{}",
        env::consts::DLL_SUFFIX
    ));
    fs::copy(&artifact, &staged)?;
    Ok(staged)
}

/// Locates the newest built `cdylib` for `library`.
pub fn find_artifact(library: &str) -> io::Result<PathBuf> {
    let exe = env::current_exe()?;
    let deps = exe
        .parent()
        .ok_or_else(|| io::Error::other("test executable has no parent directory"))?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for dir in [Some(deps), deps.parent()].into_iter().flatten() {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_artifact_name(library, path.file_name()) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
    }
    newest.map(|(_, path)| path).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "no {}{library}{} next to {}",
                env::consts::DLL_PREFIX,
                env::consts::DLL_SUFFIX,
                deps.display()
            ),
        )
    })
}

/// Matches `<prefix><library><suffix>` and `<prefix><library>-<hash><suffix>`.
fn is_artifact_name(library: &str, file_name: Option<&OsStr>) -> bool {
    let Some(name) = file_name.and_then(OsStr::to_str) else {
        return false;
    };
    let Some(stem) = name
        .strip_prefix(env::consts::DLL_PREFIX)
        .and_then(|rest| rest.strip_suffix(env::consts::DLL_SUFFIX))
    else {
        return false;
    };
    match stem.strip_prefix(library) {
        Some("") => true,
        Some(hash) => hash.starts_with('-') && hash[1..].chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}
