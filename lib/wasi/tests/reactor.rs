//! A reactor module exports `check`, which the host calls after a one-time
//! instantiation. These tests play the part of that export.

mod common;

use common::{image, read_to_string, write_file};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wasi_vfs::{Session, WasiVfs, WasiVfsBuilder};
use wasi_vfs_types::Errno;

const HELLO: &str = "Hello, world!\n";

fn check(vfs: &mut WasiVfs) -> Result<(), Errno> {
    let content = read_to_string(vfs, "/hello.txt")?;
    assert_eq!(content, HELLO);
    Ok(())
}

fn check_stage(vfs: &mut WasiVfs, stage: u32) -> Result<(), Errno> {
    match stage {
        1 => {
            assert_eq!(read_to_string(vfs, "/stage.txt"), Err(Errno::Noent));
            write_file(vfs, "/stage.txt", "stage 1 done")?;
            write_file(vfs, "/mnt/stage.log", "stage 1")
        }
        2 => {
            assert_eq!(read_to_string(vfs, "/stage.txt")?, "stage 1 done");
            write_file(vfs, "/mnt/stage.log", "stage 2")
        }
        _ => Err(Errno::Inval),
    }
}

#[test]
#[tracing_test::traced_test]
fn reactor_model() -> anyhow::Result<()> {
    let builder = WasiVfsBuilder::new().image(image(&[("/", "hello.txt", HELLO.as_bytes())])?);
    let mut session = Session::instantiate(&builder)?;

    session.call(check)?;
    session.call(check)?;
    assert!(session.is_running());

    session.teardown();
    assert_eq!(session.call(check), Err(Errno::Badf));
    Ok(())
}

#[test]
fn pack_twice_reactor() -> anyhow::Result<()> {
    let host = TempDir::new()?;
    let builder = WasiVfsBuilder::new()
        .image(image(&[("/", "hello.txt", HELLO.as_bytes())])?)
        .map_dir("/mnt", host.path())?;

    let mut session = Session::instantiate(&builder)?;
    session.call(|vfs| check_stage(vfs, 1))?;
    session.call(|vfs| check_stage(vfs, 2))?;
    session.call(check)?;
    session.teardown();
    assert_eq!(std::fs::read_to_string(host.path().join("stage.log"))?, "stage 2");

    // the packed marker was only in the overlay of the first instance
    let mut fresh = Session::instantiate(&builder)?;
    fresh.call(|vfs| check_stage(vfs, 1))?;
    assert_eq!(std::fs::read_to_string(host.path().join("stage.log"))?, "stage 1");
    Ok(())
}

#[test]
fn instances_are_isolated() -> anyhow::Result<()> {
    let builder = WasiVfsBuilder::new().image(image(&[("/", "hello.txt", HELLO.as_bytes())])?);
    let mut first = Session::instantiate(&builder)?;
    let mut second = Session::instantiate(&builder)?;

    first.call(|vfs| write_file(vfs, "/hello.txt", "changed"))?;
    assert_eq!(first.call(|vfs| read_to_string(vfs, "/hello.txt"))?, "changed");
    second.call(check)?;
    Ok(())
}

#[test]
fn export_carries_the_overlay() -> anyhow::Result<()> {
    let builder = WasiVfsBuilder::new().image(image(&[("/", "hello.txt", HELLO.as_bytes())])?);
    let mut session = Session::instantiate(&builder)?;
    session.call(|vfs| write_file(vfs, "/new.txt", "new"))?;

    let exported = session.teardown_and_export()?;
    let mut reloaded = Session::instantiate(&WasiVfsBuilder::new().image(exported.encode()))?;
    assert_eq!(reloaded.call(|vfs| read_to_string(vfs, "/new.txt"))?, "new");
    reloaded.call(check)?;
    Ok(())
}
