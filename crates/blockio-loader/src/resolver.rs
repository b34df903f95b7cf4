//! Maps device types to module files under the plugins root.
//!
//! A device type `t` lives at `<root>/t_op.<ext>`, where `<ext>` is the
//! platform's shared library extension (`so`, `dylib` or `dll`).

use std::env::consts::DLL_EXTENSION;
use std::path::{Path, PathBuf};

/// Suffix appended to the device type to form the module file stem.
pub const MODULE_SUFFIX: &str = "_op";

/// File name of the module for `device_type`, e.g. `posix_op.so`.
pub fn module_file_name(device_type: &str) -> String {
    format!("{device_type}{MODULE_SUFFIX}.{DLL_EXTENSION}")
}

/// Inverse of [`module_file_name`]. Returns `None` for names that do not
/// follow the convention.
pub fn device_type_from_file_name(file_name: &str) -> Option<&str> {
    let stem = file_name
        .strip_suffix(DLL_EXTENSION)?
        .strip_suffix('.')?
        .strip_suffix(MODULE_SUFFIX)?;
    (!stem.is_empty()).then_some(stem)
}

/// Resolves module paths relative to a plugins root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleResolver {
    root: PathBuf,
}

impl ModuleResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the module for `device_type` is expected at.
    ///
    /// Performs no I/O. Unknown device types still get a path; whether a
    /// file exists there is the loader's concern.
    pub fn module_path(&self, device_type: &str) -> PathBuf {
        self.root.join(module_file_name(device_type))
    }

    /// Device types with a conventionally named file under the root, sorted.
    ///
    /// A missing root yields an empty list.
    pub fn discover(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "cannot scan plugins root");
                return Vec::new();
            }
        };

        let mut found: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| !t.is_dir()))
            .filter_map(|entry| {
                let name = entry.file_name();
                device_type_from_file_name(name.to_str()?).map(str::to_owned)
            })
            .collect();
        found.sort();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn module_path_follows_convention() {
        let resolver = ModuleResolver::new("/opt/blockio/plugins");
        let path = resolver.module_path("async_io");
        assert_eq!(
            path,
            Path::new("/opt/blockio/plugins").join(format!("async_io_op.{DLL_EXTENSION}"))
        );
    }

    #[test]
    fn file_name_parsing() {
        assert_eq!(
            device_type_from_file_name(&module_file_name("gds")),
            Some("gds")
        );
        assert_eq!(device_type_from_file_name(&format!("_op.{DLL_EXTENSION}")), None);
        assert_eq!(device_type_from_file_name("posix_op.txt"), None);
        assert_eq!(device_type_from_file_name(&format!("posix.{DLL_EXTENSION}")), None);
    }

    #[test]
    fn discover_lists_conventional_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            module_file_name("posix"),
            module_file_name("async_io"),
            "README.md".to_string(),
            format!("libhelper.{DLL_EXTENSION}"),
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join(module_file_name("nested"))).unwrap();

        let resolver = ModuleResolver::new(dir.path());
        assert_eq!(resolver.discover(), vec!["async_io", "posix"]);
    }

    #[test]
    fn discover_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ModuleResolver::new(dir.path().join("absent"));
        assert!(resolver.discover().is_empty());
    }

    proptest! {
        #[test]
        fn prop_module_path_is_pure(device_type in "[a-z0-9_]{1,24}") {
            let resolver = ModuleResolver::new("plugins");
            let first = resolver.module_path(&device_type);
            prop_assert_eq!(&first, &resolver.module_path(&device_type));
            prop_assert_eq!(first.parent(), Some(Path::new("plugins")));

            let name = first.file_name().unwrap().to_str().unwrap();
            prop_assert_eq!(device_type_from_file_name(name), Some(device_type.as_str()));
        }
    }
}
