mod common;

use common::{READ_RIGHTS, WRITE_RIGHTS, image, open, read_to_string};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wasi_vfs::{WasiVfs, WasiVfsBuilder, syscalls};
use wasi_vfs_fs::ImageBuilder;
use wasi_vfs_types::{Advice, Errno, Fdflags, Filetype, Lookupflags, Oflags, Rights, Whence};

fn vfs() -> anyhow::Result<WasiVfs> {
    Ok(WasiVfsBuilder::new()
        .image(image(&[
            ("/", "hello.txt", &b"Hello, world!\n"[..]),
            ("/", "dir/", &b""[..]),
        ])?)
        .build()?)
}

#[test]
fn closed_descriptors_are_not_reused() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let first = open(&mut vfs, "/hello.txt", Oflags::empty(), READ_RIGHTS)?;
    syscalls::fd_close(&mut vfs, first)?;
    assert_eq!(syscalls::fd_close(&mut vfs, first), Err(Errno::Badf));
    assert_eq!(syscalls::fd_read(&mut vfs, first, &mut [&mut [0u8; 4][..]]), Err(Errno::Badf));

    let second = open(&mut vfs, "/hello.txt", Oflags::empty(), READ_RIGHTS)?;
    assert!(second > first);
    Ok(())
}

#[test]
fn renumber_replaces_the_target() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let file = open(&mut vfs, "/hello.txt", Oflags::empty(), READ_RIGHTS)?;
    let dir = open(&mut vfs, "/dir", Oflags::DIRECTORY, READ_RIGHTS)?;

    syscalls::fd_renumber(&mut vfs, file, dir)?;
    assert_eq!(syscalls::fd_fdstat_get(&vfs, file), Err(Errno::Badf));
    assert_eq!(
        syscalls::fd_fdstat_get(&vfs, dir)?.fs_filetype,
        Filetype::RegularFile
    );
    assert_eq!(syscalls::fd_renumber(&mut vfs, dir, 1000), Err(Errno::Badf));
    Ok(())
}

#[test]
fn preopens_can_be_closed() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    assert!(matches!(syscalls::fd_prestat_get(&vfs, 3), Ok(_)));
    assert_eq!(syscalls::fd_prestat_get(&vfs, 0), Err(Errno::Badf));

    let mut name = [0u8; 0];
    assert_eq!(
        syscalls::fd_prestat_dir_name(&vfs, 3, &mut name),
        Err(Errno::Nametoolong)
    );

    syscalls::fd_close(&mut vfs, 3)?;
    assert_eq!(syscalls::fd_prestat_get(&vfs, 3), Err(Errno::Badf));
    assert_eq!(read_to_string(&mut vfs, "/hello.txt"), Err(Errno::Noent));
    Ok(())
}

#[test]
#[tracing_test::traced_test]
fn rights_are_enforced() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let fd = open(&mut vfs, "/hello.txt", Oflags::empty(), READ_RIGHTS)?;
    assert_eq!(syscalls::fd_write(&mut vfs, fd, &[&b"x"[..]]), Err(Errno::Access));
    assert!(logs_contain("descriptor lacks rights"));

    // rights can only shrink
    assert_eq!(
        syscalls::fd_fdstat_set_rights(&mut vfs, fd, WRITE_RIGHTS, Rights::empty()),
        Err(Errno::Notcapable)
    );
    syscalls::fd_fdstat_set_rights(&mut vfs, fd, Rights::FD_SEEK, Rights::empty())?;
    assert_eq!(syscalls::fd_read(&mut vfs, fd, &mut [&mut [0u8; 4][..]]), Err(Errno::Access));
    assert_eq!(syscalls::fd_fdstat_get(&vfs, fd)?.fs_rights_base, Rights::FD_SEEK);

    assert_eq!(
        open(&mut vfs, "/hello.txt", Oflags::TRUNC, READ_RIGHTS),
        Err(Errno::Access)
    );
    Ok(())
}

#[test]
fn read_only_packed_files_cannot_be_written() -> anyhow::Result<()> {
    let mut builder = ImageBuilder::new();
    let root = builder.add_root("/", Default::default())?;
    builder.add_file(root, "locked.txt", b"locked".to_vec(), true, Default::default())?;
    let mut vfs = WasiVfsBuilder::new().image(builder.build().encode()).build()?;

    assert_eq!(
        open(&mut vfs, "/locked.txt", Oflags::empty(), WRITE_RIGHTS),
        Err(Errno::Access)
    );
    assert_eq!(read_to_string(&mut vfs, "/locked.txt")?, "locked");
    Ok(())
}

#[test]
fn open_flags_are_checked() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    assert_eq!(
        open(&mut vfs, "/hello.txt", Oflags::CREATE | Oflags::EXCL, WRITE_RIGHTS),
        Err(Errno::Exist)
    );
    assert_eq!(
        open(&mut vfs, "/hello.txt", Oflags::DIRECTORY, READ_RIGHTS),
        Err(Errno::Notdir)
    );
    assert_eq!(open(&mut vfs, "/dir", Oflags::empty(), WRITE_RIGHTS), Err(Errno::Isdir));
    assert_eq!(open(&mut vfs, "/missing.txt", Oflags::empty(), READ_RIGHTS), Err(Errno::Noent));

    let dir = open(&mut vfs, "/dir", Oflags::DIRECTORY, READ_RIGHTS)?;
    assert_eq!(syscalls::fd_read(&mut vfs, dir, &mut [&mut [0u8; 4][..]]), Err(Errno::Isdir));
    Ok(())
}

#[test]
fn truncation_is_checked_after_lookup() -> anyhow::Result<()> {
    let host = TempDir::new()?;
    std::fs::write(host.path().join("real.txt"), "real")?;
    let mut vfs = WasiVfsBuilder::new()
        .image(image(&[("/", "hello.txt", &b"Hello, world!\n"[..])])?)
        .map_dir("/host", host.path())?
        .build()?;

    for missing in ["/missing.txt", "/host/missing.txt"] {
        assert_eq!(open(&mut vfs, missing, Oflags::TRUNC, READ_RIGHTS), Err(Errno::Noent));
        assert_eq!(
            open(&mut vfs, missing, Oflags::CREATE | Oflags::TRUNC, READ_RIGHTS),
            Err(Errno::Access)
        );
    }
    assert_eq!(open(&mut vfs, "/hello.txt", Oflags::TRUNC, READ_RIGHTS), Err(Errno::Access));
    assert_eq!(open(&mut vfs, "/host/real.txt", Oflags::TRUNC, READ_RIGHTS), Err(Errno::Access));
    assert_eq!(read_to_string(&mut vfs, "/hello.txt")?, "Hello, world!\n");
    assert_eq!(std::fs::read_to_string(host.path().join("real.txt"))?, "real");
    assert!(!host.path().join("missing.txt").exists());
    Ok(())
}

#[test]
fn seek_and_tell() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let fd = open(&mut vfs, "/hello.txt", Oflags::empty(), READ_RIGHTS)?;

    assert_eq!(syscalls::fd_seek(&mut vfs, fd, 7, Whence::Set)?, 7);
    let mut buf = [0u8; 5];
    assert_eq!(syscalls::fd_read(&mut vfs, fd, &mut [&mut buf[..]])?, 5);
    assert_eq!(&buf, b"world");
    assert_eq!(syscalls::fd_tell(&vfs, fd)?, 12);

    assert_eq!(syscalls::fd_seek(&mut vfs, fd, -2, Whence::Cur)?, 10);
    assert_eq!(syscalls::fd_seek(&mut vfs, fd, -1, Whence::End)?, 13);
    assert_eq!(syscalls::fd_seek(&mut vfs, fd, -14, Whence::Cur), Err(Errno::Inval));
    assert_eq!(syscalls::fd_tell(&vfs, fd)?, 13);

    // past the end reads nothing
    assert_eq!(syscalls::fd_seek(&mut vfs, fd, 100, Whence::Set)?, 100);
    assert_eq!(syscalls::fd_read(&mut vfs, fd, &mut [&mut buf[..]])?, 0);
    Ok(())
}

#[test]
fn seek_on_directories_and_streams() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let dir = open(&mut vfs, "/dir", Oflags::DIRECTORY, READ_RIGHTS)?;
    assert_eq!(syscalls::fd_seek(&mut vfs, dir, 0, Whence::End), Err(Errno::Inval));
    for stdio in 0..3 {
        assert_eq!(syscalls::fd_seek(&mut vfs, stdio, 0, Whence::Set), Err(Errno::Spipe));
        assert_eq!(syscalls::fd_tell(&vfs, stdio), Err(Errno::Spipe));
    }
    assert_eq!(
        syscalls::fd_pread(&mut vfs, 0, &mut [&mut [0u8; 1][..]], 0),
        Err(Errno::Spipe)
    );
    Ok(())
}

#[test]
fn positional_io_keeps_the_offset() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let fd = open(&mut vfs, "/hello.txt", Oflags::empty(), WRITE_RIGHTS)?;
    assert_eq!(syscalls::fd_pwrite(&mut vfs, fd, &[&b"J"[..]], 0)?, 1);
    let mut buf = [0u8; 5];
    assert_eq!(syscalls::fd_pread(&mut vfs, fd, &mut [&mut buf[..]], 0)?, 5);
    assert_eq!(&buf, b"Jello");
    assert_eq!(syscalls::fd_tell(&vfs, fd)?, 0);
    Ok(())
}

#[test]
fn append_writes_at_the_end() -> anyhow::Result<()> {
    let host = TempDir::new()?;
    std::fs::write(host.path().join("log.txt"), "one\n")?;
    let mut vfs = WasiVfsBuilder::new()
        .image(image(&[("/", "log.txt", &b"one\n"[..])])?)
        .map_dir("/host", host.path())?
        .build()?;

    for path in ["/log.txt", "/host/log.txt"] {
        let rights = WRITE_RIGHTS | Rights::FD_FDSTAT_SET_FLAGS;
        let fd = open(&mut vfs, path, Oflags::empty(), rights)?;
        syscalls::fd_fdstat_set_flags(&mut vfs, fd, Fdflags::APPEND)?;
        syscalls::fd_seek(&mut vfs, fd, 0, Whence::Set)?;
        syscalls::fd_write(&mut vfs, fd, &[&b"two\n"[..]])?;
        syscalls::fd_fdstat_set_flags(&mut vfs, fd, Fdflags::empty())?;
        syscalls::fd_seek(&mut vfs, fd, 0, Whence::Set)?;
        syscalls::fd_write(&mut vfs, fd, &[&b"ONE\n"[..]])?;
        syscalls::fd_close(&mut vfs, fd)?;
        assert_eq!(read_to_string(&mut vfs, path)?, "ONE\ntwo\n");
    }
    assert_eq!(std::fs::read_to_string(host.path().join("log.txt"))?, "ONE\ntwo\n");
    Ok(())
}

#[test]
fn sizes_and_allocation() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let fd = open(&mut vfs, "/hello.txt", Oflags::empty(), WRITE_RIGHTS)?;
    syscalls::fd_filestat_set_size(&mut vfs, fd, 5)?;
    assert_eq!(syscalls::fd_filestat_get(&vfs, fd)?.st_size, 5);
    assert_eq!(read_to_string(&mut vfs, "/hello.txt")?, "Hello");

    let rights = WRITE_RIGHTS | Rights::FD_ALLOCATE;
    let fd = open(&mut vfs, "/hello.txt", Oflags::empty(), rights)?;
    syscalls::fd_allocate(&mut vfs, fd, 0, 8)?;
    assert_eq!(syscalls::fd_filestat_get(&vfs, fd)?.st_size, 8);
    // allocating never shrinks
    syscalls::fd_allocate(&mut vfs, fd, 0, 2)?;
    assert_eq!(syscalls::fd_filestat_get(&vfs, fd)?.st_size, 8);

    let dir = open(&mut vfs, "/dir", Oflags::DIRECTORY, WRITE_RIGHTS - Rights::FD_WRITE)?;
    assert_eq!(syscalls::fd_filestat_set_size(&mut vfs, dir, 0), Err(Errno::Isdir));
    Ok(())
}

#[test]
fn files_cannot_grow_past_the_size_limit() -> anyhow::Result<()> {
    let mut vfs = vfs()?;
    let rights = WRITE_RIGHTS | Rights::FD_ALLOCATE;
    let fd = open(&mut vfs, "/hello.txt", Oflags::empty(), rights)?;

    assert_eq!(syscalls::fd_filestat_set_size(&mut vfs, fd, 1 << 63), Err(Errno::Fbig));
    assert_eq!(syscalls::fd_allocate(&mut vfs, fd, 1 << 62, 1 << 62), Err(Errno::Fbig));
    assert_eq!(syscalls::fd_allocate(&mut vfs, fd, u64::MAX, 1), Err(Errno::Inval));

    syscalls::fd_seek(&mut vfs, fd, i64::MAX - 15, Whence::Set)?;
    assert_eq!(syscalls::fd_write(&mut vfs, fd, &[&b"x"[..]]), Err(Errno::Fbig));
    assert_eq!(
        syscalls::fd_pwrite(&mut vfs, fd, &[&b"x"[..]], u64::from(u32::MAX)),
        Err(Errno::Fbig)
    );

    assert_eq!(syscalls::fd_filestat_get(&vfs, fd)?.st_size, 14);
    assert_eq!(read_to_string(&mut vfs, "/hello.txt")?, "Hello, world!\n");
    Ok(())
}

#[test]
fn attributes_and_hints() -> anyhow::Result<()> {
    let host = TempDir::new()?;
    std::fs::write(host.path().join("real.txt"), "real")?;
    let mut vfs = WasiVfsBuilder::new()
        .image(image(&[("/", "hello.txt", &b"Hello, world!\n"[..]), ("/", "dir/", &b""[..])])?)
        .map_dir("/host", host.path())?
        .build()?;
    let (host_fd, root_fd) = (3, 4);

    let stat = syscalls::path_filestat_get(&vfs, root_fd, Lookupflags::SYMLINK_FOLLOW, "hello.txt")?;
    assert_eq!(stat.st_filetype, Filetype::RegularFile);
    assert_eq!(stat.st_size, 14);
    let dir = syscalls::path_filestat_get(&vfs, root_fd, Lookupflags::empty(), "dir")?;
    assert_eq!(dir.st_filetype, Filetype::Directory);
    assert_ne!(dir.st_ino, stat.st_ino);
    let real = syscalls::path_filestat_get(&vfs, host_fd, Lookupflags::empty(), "real.txt")?;
    assert_eq!(real.st_size, 4);
    assert_eq!(
        syscalls::path_filestat_get(&vfs, root_fd, Lookupflags::empty(), "missing"),
        Err(Errno::Noent)
    );
    assert_eq!(
        syscalls::fd_filestat_get(&vfs, 1)?.st_filetype,
        Filetype::CharacterDevice
    );

    let rights = READ_RIGHTS | Rights::FD_ADVISE | Rights::FD_SYNC | Rights::FD_DATASYNC;
    for path in ["/hello.txt", "/host/real.txt"] {
        let fd = open(&mut vfs, path, Oflags::empty(), rights)?;
        syscalls::fd_advise(&vfs, fd, 0, 4, Advice::Sequential)?;
        syscalls::fd_datasync(&vfs, fd)?;
        syscalls::fd_sync(&vfs, fd)?;
    }
    syscalls::fd_sync(&vfs, 1)?;
    assert_eq!(syscalls::fd_advise(&vfs, 1, 0, 0, Advice::Normal), Err(Errno::Spipe));
    assert_eq!(syscalls::poll_oneoff(&vfs, &[], &mut []), Err(Errno::Notsup));
    Ok(())
}
