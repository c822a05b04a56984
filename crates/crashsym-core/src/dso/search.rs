//! Filesystem lookups used to locate DSOs.
//!
//! Three collaborators live in every search root: the build tree itself,
//! a build-id index (`ids.txt`) and a boot filesystem manifest
//! (`bootfs.manifest`). A missing or unreadable file only means "not found
//! here"; the next root is tried.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Build-id index file name inside a search root.
pub const BUILD_ID_INDEX: &str = "ids.txt";

/// Boot filesystem manifest file name inside a search root.
pub const BOOT_MANIFEST: &str = "bootfs.manifest";

/// Suffix marking a stripped binary in the boot manifest.
pub const STRIP_SUFFIX: &str = ".strip";

/// Directory name whose contents are never searched.
pub const SYSROOT_MARKER: &str = "sysroot";

/// Find a file called `name` below any of `roots`.
///
/// Roots are searched in order. Inside a root, the files of a directory are
/// checked before its subdirectories and entries are visited in
/// lexicographic order, so the first match is deterministic. Directory
/// symlinks are not followed and `sysroot` trees are skipped.
pub fn find_file(name: &str, roots: &[PathBuf]) -> Option<PathBuf>
{
    if name.is_empty() {
        return None;
    }
    roots
        .iter()
        .filter(|root| !in_sysroot(root))
        .find_map(|root| find_in_dir(root, OsStr::new(name)))
}

fn find_in_dir(dir: &Path, name: &OsStr) -> Option<PathBuf>
{
    let mut entries: Vec<_> = fs::read_dir(dir).ok()?.filter_map(Result::ok).collect();
    entries.sort_by_key(fs::DirEntry::file_name);

    let mut subdirs = Vec::new();
    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            if entry.file_name() != SYSROOT_MARKER {
                subdirs.push(path);
            }
        } else if entry.file_name() == name && path.is_file() {
            return Some(path);
        }
    }

    subdirs.iter().find_map(|subdir| find_in_dir(subdir, name))
}

fn in_sysroot(path: &Path) -> bool
{
    path.components()
        .any(|component| matches!(component, Component::Normal(part) if part == SYSROOT_MARKER))
}

/// Look up `build_id` in the build-id index of each root.
///
/// Index lines are `<build id> <path>`; relative paths are taken relative
/// to the root holding the index.
pub fn lookup_build_id(build_id: &str, roots: &[PathBuf]) -> Option<PathBuf>
{
    roots.iter().find_map(|root| {
        let index = root.join(BUILD_ID_INDEX);
        scan_lines(&index, |line| {
            let (id, path) = line.split_once(' ')?;
            (id == build_id).then(|| root.join(path.trim()))
        })
    })
}

/// Look up a boot filesystem path in the manifest of each root.
///
/// `boot_path` is the path inside the boot filesystem without the `/boot/`
/// prefix, e.g. `bin/sh`. Manifest lines are `<output>=<input>`; when the
/// input is a stripped binary the unstripped companion next to it is
/// returned instead.
pub fn lookup_manifest(boot_path: &str, roots: &[PathBuf]) -> Option<PathBuf>
{
    roots.iter().find_map(|root| {
        let manifest = root.join(BOOT_MANIFEST);
        scan_lines(&manifest, |line| {
            let (output, input) = line.split_once('=')?;
            if output != boot_path {
                return None;
            }
            let input = input.trim();
            let unstripped = input.strip_suffix(STRIP_SUFFIX).unwrap_or(input);
            Some(root.join(unstripped))
        })
    })
}

fn scan_lines<F>(path: &Path, mut matcher: F) -> Option<PathBuf>
where
    F: FnMut(&str) -> Option<PathBuf>,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            debug!("skipping {}: {err}", path.display());
            return None;
        }
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .find_map(|line| matcher(&line))
}
