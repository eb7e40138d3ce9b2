//! Differ and copier against the host filesystem.

use std::fs;
use std::path::Path;

use fstestkit_io_fs::{
    FileSystem, MemFs, OsFs, ReportDiff, TreeFsError, compare_dir, compare_file, copy_dir,
    copy_file, diff_dir, diff_file, in_memory_copy,
};
use pretty_assertions::assert_eq;

fn write_fixture(root: &Path) {
    fs::create_dir_all(root.join("sub/deeper")).unwrap();
    fs::write(root.join("f"), b"abcdef").unwrap();
    fs::write(root.join("sub/g"), b"xyz").unwrap();
    fs::write(root.join("sub/deeper/empty"), b"").unwrap();
    fs::write(root.join("binary.bin"), [0u8, 159, 146, 150, 255]).unwrap();
}

#[test]
fn in_memory_copy_snapshot_matches_disk() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());

    let fs_mem = in_memory_copy(tmp.path(), "/snapshot").unwrap();

    assert_eq!(
        diff_dir(&OsFs, &fs_mem, tmp.path(), "/snapshot").unwrap(),
        ReportDiff::equal()
    );
    assert_eq!(fs_mem.read_file("/snapshot/sub/g").unwrap(), b"xyz");
}

#[test]
fn snapshot_detects_later_disk_changes() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    let fs_mem = in_memory_copy(tmp.path(), "/snapshot").unwrap();

    fs::write(tmp.path().join("sub/g"), b"xyzw").unwrap();
    let report = diff_dir(&OsFs, &fs_mem, tmp.path(), "/snapshot").unwrap();
    assert!(!report.if_equal);
    assert!(
        report.detail.ends_with("differ: size differs between 4 and 3"),
        "{}",
        report.detail
    );

    fs::write(tmp.path().join("extra"), b"").unwrap();
    let report = diff_dir(&OsFs, &fs_mem, tmp.path(), "/snapshot").unwrap();
    assert!(report.detail.starts_with("files differ in "), "{}", report.detail);
    assert!(report.detail.contains("[binary.bin extra f sub]"), "{}", report.detail);
    assert!(report.detail.ends_with("/snapshot [binary.bin f sub]"), "{}", report.detail);
}

#[test]
fn copy_from_memory_to_disk_round_trips() {
    let fs_mem = MemFs::new();
    fs_mem.write_file("/a/f", b"abcdef", 0o644).unwrap();
    fs_mem.write_file("/a/sub/g", b"xyz", 0o600).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let path_dst = tmp.path().join("b");
    let report = copy_dir(&fs_mem, &OsFs, "/a", &path_dst).unwrap();
    assert_eq!(report.cnt_files, 2);
    assert_eq!(report.cnt_bytes, 9);

    assert!(compare_dir(&fs_mem, &OsFs, "/a", &path_dst).unwrap());
    assert!(compare_dir(&OsFs, &fs_mem, &path_dst, "/a").unwrap());
    assert_eq!(fs::read(path_dst.join("f")).unwrap(), b"abcdef");
}

#[test]
fn copy_dir_on_disk_refuses_existing_destination() {
    let tmp = tempfile::tempdir().unwrap();
    let path_src = tmp.path().join("src");
    let path_dst = tmp.path().join("dst");
    write_fixture(&path_src);
    fs::create_dir(&path_dst).unwrap();

    let err = copy_dir(&OsFs, &OsFs, &path_src, &path_dst).unwrap_err();
    assert!(matches!(err, TreeFsError::DestinationExists(_)));
    assert!(OsFs.read_dir(&path_dst).unwrap().is_empty());
}

#[test]
fn file_comparison_across_backends() {
    let tmp = tempfile::tempdir().unwrap();
    let path_file = tmp.path().join("file");
    fs::write(&path_file, b"abcdef").unwrap();
    let n_mode = OsFs.stat(&path_file).unwrap().mode;

    let fs_mem = MemFs::new();
    fs_mem.write_file("/same", b"abcdef", n_mode).unwrap();
    fs_mem.write_file("/longer", b"abcdefghijkl", n_mode).unwrap();

    assert!(compare_file(&OsFs, &fs_mem, &path_file, "/same").unwrap());
    assert_eq!(
        diff_file(&OsFs, &fs_mem, &path_file, "/longer").unwrap(),
        ReportDiff::differ("size differs between 6 and 12")
    );

    let err = diff_file(&OsFs, &fs_mem, tmp.path().join("missing"), "/same").unwrap_err();
    assert!(matches!(err, TreeFsError::Io { .. }));
}

#[test]
fn copy_file_on_disk_keeps_existing_destination() {
    let tmp = tempfile::tempdir().unwrap();
    let path_src = tmp.path().join("src");
    let path_dst = tmp.path().join("dst");
    fs::write(&path_src, b"new").unwrap();
    fs::write(&path_dst, b"old").unwrap();

    let err = copy_file(&OsFs, &OsFs, &path_src, &path_dst).unwrap_err();
    assert!(matches!(err, TreeFsError::DestinationExists(_)));
    assert_eq!(fs::read(&path_dst).unwrap(), b"old");
}

#[cfg(unix)]
mod unix {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn copy_preserves_permission_bits() {
        let tmp = tempfile::tempdir().unwrap();
        let path_src = tmp.path().join("src");
        write_fixture(&path_src);
        fs::set_permissions(path_src.join("f"), fs::Permissions::from_mode(0o600)).unwrap();
        fs::set_permissions(path_src.join("sub"), fs::Permissions::from_mode(0o750)).unwrap();

        let path_dst = tmp.path().join("dst");
        copy_dir(&OsFs, &OsFs, &path_src, &path_dst).unwrap();

        let n_mode_file = fs::metadata(path_dst.join("f")).unwrap().permissions().mode();
        let n_mode_dir = fs::metadata(path_dst.join("sub")).unwrap().permissions().mode();
        assert_eq!(n_mode_file & 0o7777, 0o600);
        assert_eq!(n_mode_dir & 0o7777, 0o750);
        assert!(compare_dir(&OsFs, &OsFs, &path_src, &path_dst).unwrap());
    }

    #[test]
    fn permission_change_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path_a = tmp.path().join("a");
        let path_b = tmp.path().join("b");
        fs::write(&path_a, b"abcdef").unwrap();
        fs::write(&path_b, b"abcdef").unwrap();
        fs::set_permissions(&path_a, fs::Permissions::from_mode(0o644)).unwrap();
        fs::set_permissions(&path_b, fs::Permissions::from_mode(0o600)).unwrap();

        let report = diff_file(&OsFs, &OsFs, &path_a, &path_b).unwrap();
        assert_eq!(report.detail, "permissions differ between 0644 and 0600");
    }

    #[test]
    fn symlinks_are_rejected_without_partial_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let path_src = tmp.path().join("src");
        write_fixture(&path_src);
        std::os::unix::fs::symlink(path_src.join("f"), path_src.join("sub/link")).unwrap();

        let err = in_memory_copy(&path_src, "/snapshot").unwrap_err();
        match err {
            TreeFsError::SymlinkUnsupported(path) => assert_eq!(path, path_src.join("sub/link")),
            other => panic!("unexpected error: {other}"),
        }

        let path_dst = tmp.path().join("dst");
        let err = copy_dir(&OsFs, &OsFs, &path_src, &path_dst).unwrap_err();
        assert!(matches!(err, TreeFsError::SymlinkUnsupported(_)));
        assert!(!path_dst.exists());

        let err = compare_dir(&OsFs, &OsFs, &path_src, &path_src).unwrap_err();
        assert!(matches!(err, TreeFsError::SymlinkUnsupported(_)));
    }

    #[test]
    fn non_utf8_names_compare_and_copy() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let path_src = tmp.path().join("src");
        write_fixture(&path_src);
        fs::write(path_src.join(OsStr::from_bytes(b"bad\xffname")), b"abc").unwrap();
        fs::create_dir(path_src.join(OsStr::from_bytes(b"dir\xfe"))).unwrap();
        fs::write(path_src.join(OsStr::from_bytes(b"dir\xfe/inner")), b"in").unwrap();

        assert!(compare_dir(&OsFs, &OsFs, &path_src, &path_src).unwrap());

        let fs_mem = in_memory_copy(&path_src, "/snapshot").unwrap();
        assert!(compare_dir(&OsFs, &fs_mem, &path_src, "/snapshot").unwrap());
        assert_eq!(
            fs_mem
                .read_file(Path::new("/snapshot").join(OsStr::from_bytes(b"bad\xffname")))
                .unwrap(),
            b"abc"
        );

        let path_dst = tmp.path().join("dst");
        let report = copy_dir(&OsFs, &OsFs, &path_src, &path_dst).unwrap();
        assert_eq!(report.cnt_files, 6);
        assert!(compare_dir(&OsFs, &OsFs, &path_src, &path_dst).unwrap());
        assert!(compare_dir(&fs_mem, &OsFs, "/snapshot", &path_dst).unwrap());
    }

    #[test]
    fn names_with_the_same_lossy_rendering_still_differ() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let path_a = tmp.path().join("a");
        let path_b = tmp.path().join("b");
        fs::create_dir(&path_a).unwrap();
        fs::create_dir(&path_b).unwrap();
        fs::write(path_a.join(OsStr::from_bytes(b"x\xff")), b"same").unwrap();
        fs::write(path_b.join(OsStr::from_bytes(b"x\xfe")), b"same").unwrap();

        let report = diff_dir(&OsFs, &OsFs, &path_a, &path_b).unwrap();
        assert!(!report.if_equal);
        assert!(report.detail.starts_with("files differ in "), "{}", report.detail);
        assert!(report.detail.contains("[x\u{fffd}]"), "{}", report.detail);
    }

    #[test]
    fn special_files_are_rejected_without_partial_copy() {
        use std::os::unix::net::UnixListener;

        let tmp = tempfile::tempdir().unwrap();
        let path_src = tmp.path().join("src");
        write_fixture(&path_src);
        let path_sock = path_src.join("sub/sock");
        let _listener = UnixListener::bind(&path_sock).unwrap();

        let err = compare_dir(&OsFs, &OsFs, &path_src, &path_src).unwrap_err();
        match err {
            TreeFsError::SpecialFileUnsupported(path) => assert_eq!(path, path_sock),
            other => panic!("unexpected error: {other}"),
        }

        let err = diff_file(&OsFs, &OsFs, &path_sock, &path_sock).unwrap_err();
        assert!(matches!(err, TreeFsError::SpecialFileUnsupported(_)));

        let path_dst = tmp.path().join("dst");
        let err = copy_dir(&OsFs, &OsFs, &path_src, &path_dst).unwrap_err();
        assert!(matches!(err, TreeFsError::SpecialFileUnsupported(_)));
        assert!(!path_dst.exists());

        let err = in_memory_copy(&path_src, "/snapshot").unwrap_err();
        assert!(matches!(err, TreeFsError::SpecialFileUnsupported(_)));
    }
}
