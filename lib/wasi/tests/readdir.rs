mod common;

use common::{READ_RIGHTS, image, list_dir, names, open, write_file};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use wasi_vfs::{WasiVfs, WasiVfsBuilder, syscalls};
use wasi_vfs_types::{DIRCOOKIE_START, Errno, Filetype, Oflags};

fn vfs() -> anyhow::Result<WasiVfs> {
    Ok(WasiVfsBuilder::new()
        .image(image(&[
            ("/", "zeta.txt", &b"z"[..]),
            ("/", "alpha/", &b""[..]),
            ("/", "日本語.txt", &b"nihongo"[..]),
            ("/", "alpha/inner.txt", &b"inner"[..]),
        ])?)
        .build()?)
}

#[test_log::test]
fn packed_entries_come_first_in_creation_order() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    write_file(&mut vfs, "/new-b.txt", "b")?;
    syscalls::path_create_directory(&mut vfs, 3, "new-a")?;
    write_file(&mut vfs, "/new-c.txt", "c")?;

    let entries = list_dir(&mut vfs, "/")?;
    assert_eq!(
        names(&entries),
        vec!["zeta.txt", "alpha", "日本語.txt", "new-b.txt", "new-a", "new-c.txt"]
    );
    assert_eq!(entries[1].1, Filetype::Directory);
    assert_eq!(entries[2].1, Filetype::RegularFile);
    Ok(())
}

#[test]
fn removed_entries_disappear() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    syscalls::path_unlink_file(&mut vfs, 3, "zeta.txt")?;
    assert_eq!(
        syscalls::path_remove_directory(&mut vfs, 3, "alpha"),
        Err(Errno::Notempty)
    );
    syscalls::path_unlink_file(&mut vfs, 3, "alpha/inner.txt")?;
    syscalls::path_remove_directory(&mut vfs, 3, "alpha")?;
    assert_eq!(names(&list_dir(&mut vfs, "/")?), vec!["日本語.txt"]);
    Ok(())
}

#[test]
fn truncated_entries_fill_the_buffer() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let fd = open(&mut vfs, "/", Oflags::DIRECTORY, READ_RIGHTS)?;

    // a header and part of the first name
    let mut buf = [0u8; 26];
    assert_eq!(syscalls::fd_readdir(&vfs, fd, &mut buf, DIRCOOKIE_START)?, 26);
    assert_eq!(u64::from_le_bytes(buf[0..8].try_into()?), 1);
    assert_eq!(u32::from_le_bytes(buf[16..20].try_into()?), 8);
    assert_eq!(&buf[24..], b"ze");

    // resuming after the last entry returns nothing
    let mut buf = [0u8; 64];
    assert_eq!(syscalls::fd_readdir(&vfs, fd, &mut buf, 3)?, 0);

    let file = open(&mut vfs, "/zeta.txt", Oflags::empty(), READ_RIGHTS)?;
    assert_eq!(
        syscalls::fd_readdir(&vfs, file, &mut buf, DIRCOOKIE_START),
        Err(Errno::Notdir)
    );
    Ok(())
}

#[test]
fn host_directories_list_dot_entries_and_sorted_names() -> anyhow::Result<()> {
    let host = TempDir::new()?;
    for name in ["b.txt", "c.txt", "a.txt"] {
        fs::write(host.path().join(name), name)?;
    }
    fs::create_dir(host.path().join("sub"))?;
    let mut vfs = WasiVfsBuilder::new().map_dir("/host", host.path())?.build()?;

    let entries = list_dir(&mut vfs, "/host")?;
    assert_eq!(names(&entries), vec![".", "..", "a.txt", "b.txt", "c.txt", "sub"]);
    assert_eq!(entries[5].1, Filetype::Directory);
    assert_eq!(names(&list_dir(&mut vfs, "/host/sub")?), vec![".", ".."]);
    Ok(())
}
