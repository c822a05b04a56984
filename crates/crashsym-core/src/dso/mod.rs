//! # DSO Directory
//!
//! Maps the names DSOs are declared under in a backtrace to files in the
//! build output.
//!
//! ## Resolution Order
//!
//! The first hit wins:
//!
//! 1. A declared build id, looked up in the build-id index of each root.
//! 2. The application placeholder (`<application>` or `app:...`): a boot
//!    filesystem path goes through the boot manifest, anything else uses
//!    the configured application name.
//! 3. A filename search for the name itself; then, for names without a
//!    shared-library suffix, for the application name; then, for absolute
//!    names, for their last path component.
//!
//! Results, including misses, are cached by name until the architecture
//! changes, which also recomputes the search roots.

mod records;
pub mod search;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use self::records::DsoRecords;
use crate::types::Architecture;

/// Name under which the main executable is reported when its real name is unknown.
pub const APPLICATION_PLACEHOLDER: &str = "<application>";

/// Prefix of application DSO names.
pub const APPLICATION_PREFIX: &str = "app:";

const BOOT_PREFIX: &str = "/boot/";

/// Resolves DSO names to paths for one architecture epoch at a time.
#[derive(Debug, Clone)]
pub struct DsoDirectory
{
    architecture: Architecture,
    build_dirs: Vec<PathBuf>,
    search_roots: Vec<PathBuf>,
    app_name: Option<String>,
    cache: HashMap<String, Option<PathBuf>>,
}

impl DsoDirectory
{
    /// Directory for `architecture` over the given build roots.
    pub fn new(architecture: Architecture, build_dirs: Vec<PathBuf>, app_name: Option<String>) -> Self
    {
        let search_roots = architecture.search_roots(&build_dirs);
        Self {
            architecture,
            build_dirs,
            search_roots,
            app_name,
            cache: HashMap::new(),
        }
    }

    /// Current architecture.
    pub fn architecture(&self) -> &Architecture
    {
        &self.architecture
    }

    /// Directories searched in the current epoch.
    pub fn search_roots(&self) -> &[PathBuf]
    {
        &self.search_roots
    }

    /// Number of cached names (hits and misses).
    pub fn cached_len(&self) -> usize
    {
        self.cache.len()
    }

    /// Switch architecture.
    ///
    /// Returns `false` and keeps the cache when the architecture is
    /// unchanged. Otherwise starts a new epoch: the cache is emptied and
    /// the search roots recomputed.
    pub fn set_architecture(&mut self, architecture: Architecture) -> bool
    {
        if architecture == self.architecture {
            return false;
        }

        info!("architecture changed from {} to {}", self.architecture, architecture);
        self.search_roots = architecture.search_roots(&self.build_dirs);
        self.architecture = architecture;
        self.cache.clear();
        true
    }

    /// Resolve a declared DSO name to a path.
    ///
    /// `build_ids` is the `name -> build id` map of the current DSO list.
    pub fn resolve(&mut self, name: &str, build_ids: &HashMap<String, String>) -> Option<PathBuf>
    {
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }

        let resolved = self.lookup(name, build_ids);
        match &resolved {
            Some(path) => debug!("resolved {name} to {}", path.display()),
            None => debug!("can't find {name}"),
        }
        self.cache.insert(name.to_string(), resolved.clone());
        resolved
    }

    /// Filename search across the current roots, uncached.
    pub fn find_file(&self, name: &str) -> Option<PathBuf>
    {
        search::find_file(name, &self.search_roots)
    }

    fn lookup(&self, name: &str, build_ids: &HashMap<String, String>) -> Option<PathBuf>
    {
        if let Some(build_id) = build_ids.get(name) {
            if let Some(path) = search::lookup_build_id(build_id, &self.search_roots) {
                return Some(path);
            }
        }

        if name == APPLICATION_PLACEHOLDER || name.starts_with(APPLICATION_PREFIX) {
            return self.lookup_application(name);
        }

        if let Some(path) = self.find_file(name) {
            return Some(path);
        }

        if !has_shared_library_suffix(name) {
            if let Some(path) = self.app_name.as_deref().and_then(|app| self.find_file(app)) {
                return Some(path);
            }
        }

        if Path::new(name).is_absolute() {
            return Path::new(name)
                .file_name()
                .and_then(|base| base.to_str())
                .and_then(|base| self.find_file(base));
        }

        None
    }

    fn lookup_application(&self, name: &str) -> Option<PathBuf>
    {
        let boot_path = name
            .strip_prefix(APPLICATION_PREFIX)
            .and_then(|path| path.strip_prefix(BOOT_PREFIX));
        if let Some(boot_path) = boot_path {
            return search::lookup_manifest(boot_path, &self.search_roots);
        }

        self.app_name.as_deref().and_then(|app| self.find_file(app))
    }
}

/// `true` for `libfoo.so` and `libfoo.so.1`.
pub fn has_shared_library_suffix(name: &str) -> bool
{
    name.ends_with(".so") || name.contains(".so.")
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_shared_library_suffix()
    {
        assert!(has_shared_library_suffix("libc.so"));
        assert!(has_shared_library_suffix("libstdc++.so.6"));
        assert!(!has_shared_library_suffix("devmgr"));
        assert!(!has_shared_library_suffix("libsomething.a"));
    }

    #[test]
    fn test_same_architecture_keeps_cache()
    {
        let mut directory = DsoDirectory::new(Architecture::X86_64, vec![PathBuf::from("/nonexistent")], None);
        assert_eq!(directory.resolve("libfoo.so", &HashMap::new()), None);
        assert_eq!(directory.cached_len(), 1);

        assert!(!directory.set_architecture(Architecture::X86_64));
        assert_eq!(directory.cached_len(), 1);

        assert!(directory.set_architecture(Architecture::Arm64));
        assert_eq!(directory.cached_len(), 0);
        assert_eq!(directory.search_roots()[0], PathBuf::from("/nonexistent/build-arm64"));
    }
}
