//! Tests for DSO path resolution against build trees on disk

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crashsym_core::dso::DsoDirectory;
use crashsym_core::types::Architecture;
use tempfile::TempDir;

fn touch(root: &Path, relative: &str) -> PathBuf
{
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"").unwrap();
    path
}

fn directory(root: &TempDir, app_name: Option<&str>) -> DsoDirectory
{
    DsoDirectory::new(
        Architecture::X86_64,
        vec![root.path().to_path_buf()],
        app_name.map(str::to_string),
    )
}

#[test]
fn test_boot_manifest_prefers_unstripped_binary()
{
    let root = tempfile::tempdir().unwrap();
    let build = root.path().join("build-x64");
    let unstripped = touch(&build, "exe.unstripped/sh");
    touch(&build, "exe.unstripped/sh.strip");
    fs::write(build.join("bootfs.manifest"), "bin/ls=exe.unstripped/ls\nbin/sh=exe.unstripped/sh.strip\n").unwrap();

    let mut directory = directory(&root, None);
    assert_eq!(directory.resolve("app:/boot/bin/sh", &HashMap::new()), Some(unstripped));
}

#[test]
fn test_application_placeholder_uses_app_name()
{
    let root = tempfile::tempdir().unwrap();
    let devmgr = touch(root.path(), "build-x64/devmgr");

    let mut with_hint = directory(&root, Some("devmgr"));
    assert_eq!(with_hint.resolve("<application>", &HashMap::new()), Some(devmgr.clone()));
    // an executable name that does not exist falls back to the hint
    assert_eq!(with_hint.resolve("unknown-exe", &HashMap::new()), Some(devmgr));
    // shared libraries never do
    assert_eq!(with_hint.resolve("libmissing.so", &HashMap::new()), None);

    let mut without_hint = directory(&root, None);
    assert_eq!(without_hint.resolve("<application>", &HashMap::new()), None);
}

#[test]
fn test_absolute_name_falls_back_to_basename()
{
    let root = tempfile::tempdir().unwrap();
    let lib = touch(root.path(), "lib/libfoo.so");

    let mut directory = directory(&root, None);
    assert_eq!(directory.resolve("/system/lib/libfoo.so", &HashMap::new()), Some(lib));
}

#[test]
fn test_sysroot_is_never_searched()
{
    let root = tempfile::tempdir().unwrap();
    touch(root.path(), "sysroot/lib/libc.so");

    let mut directory = directory(&root, None);
    assert_eq!(directory.resolve("libc.so", &HashMap::new()), None);

    let libc = touch(root.path(), "build-x64/libc.so");
    // the miss is cached until the architecture changes
    assert_eq!(directory.resolve("libc.so", &HashMap::new()), None);
    directory.set_architecture(Architecture::Arm64);
    directory.set_architecture(Architecture::X86_64);
    assert_eq!(directory.resolve("libc.so", &HashMap::new()), Some(libc));
}

#[test]
fn test_architecture_build_dir_searched_first()
{
    let root = tempfile::tempdir().unwrap();
    touch(root.path(), "libfoo.so");
    let arch_specific = touch(root.path(), "build-x64/libfoo.so");

    let mut directory = directory(&root, None);
    assert_eq!(directory.resolve("libfoo.so", &HashMap::new()), Some(arch_specific));
}

#[test]
fn test_build_id_index_searched_before_names()
{
    let root = tempfile::tempdir().unwrap();
    touch(root.path(), "build-x64/libfoo.so");
    let debug = touch(root.path(), ".build-id/ab/cdef.debug");
    fs::write(root.path().join("ids.txt"), "abcdef .build-id/ab/cdef.debug\n").unwrap();

    let build_ids = HashMap::from([("libfoo.so".to_string(), "abcdef".to_string())]);
    let mut directory = directory(&root, None);
    assert_eq!(directory.resolve("libfoo.so", &build_ids), Some(debug));
}
