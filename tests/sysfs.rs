use std::fs;
use std::path::Path;

use gpio_sysfs::{
    Access, Attribute, Direction, ErrorKind, Level, Line, Node, Sysfs, SysfsAccess, Trigger,
};
use tempfile::TempDir;

/// Lay out a fake GPIO class directory with `line` already exported.
fn exported_line(root: &Path, line: u32) {
    let dir = root.join(format!("gpio{line}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("value"), "0\n").unwrap();
    fs::write(dir.join("active_low"), "0\n").unwrap();
    fs::write(dir.join("direction"), "in\n").unwrap();
    fs::write(dir.join("edge"), "none\n").unwrap();
}

fn read(root: &Path, line: u32, attribute: Attribute) -> String {
    fs::read_to_string(root.join(format!("gpio{line}")).join(attribute.file_name())).unwrap()
}

#[test]
fn probes_existing_line_without_exporting() {
    let root = TempDir::new().unwrap();
    exported_line(root.path(), 5);
    let sysfs = Sysfs::with_root(root.path());

    assert!(sysfs.is_exported(5).unwrap());
    assert!(!sysfs.is_exported(6).unwrap());

    let mut line = Line::request(&sysfs, 5, "test").unwrap();
    assert!(!line.is_owned());
    assert!(line.capabilities().alterable_direction);
    assert!(line.capabilities().alterable_edge);
    assert_eq!(line.direction(), Some(Direction::Input));
    assert_eq!(line.trigger(), Some(Trigger::None));

    // No export node exists, so any export attempt would have failed the request
    line.release().unwrap();
    assert!(!root.path().join("unexport").exists());
}

#[test]
fn value_handle_follows_direction() {
    let root = TempDir::new().unwrap();
    exported_line(root.path(), 5);
    let sysfs = Sysfs::with_root(root.path());

    let mut line = Line::request(&sysfs, 5, "test").unwrap();
    line.full_open().unwrap();
    assert_eq!(line.value_handle().unwrap().access(), Access::ReadOnly);
    assert_eq!(line.get_value().unwrap(), Level::Low);

    line.set_direction_output(Level::Low).unwrap();
    assert_eq!(read(root.path(), 5, Attribute::Direction), "low");
    assert_eq!(line.value_handle().unwrap().access(), Access::ReadWrite);

    line.set_value(Level::High).unwrap();
    assert_eq!(read(root.path(), 5, Attribute::Value), "1\n");
    assert_eq!(line.get_value().unwrap(), Level::High);

    line.set_direction_input().unwrap();
    let err = line.set_value(Level::Low).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Io(_)));
    assert_eq!(err.attribute(), Some(Attribute::Value));

    line.set_active_low(true).unwrap();
    assert!(line.get_active_low().unwrap());

    line.set_edge(Trigger::Both).unwrap();
    assert_eq!(line.get_edge().unwrap(), Trigger::Both);

    line.close();
    assert!(!line.is_open());
}

#[test]
fn value_handle_recovers_after_failed_reopen() {
    let root = TempDir::new().unwrap();
    exported_line(root.path(), 5);
    let sysfs = Sysfs::with_root(root.path());
    let value = root.path().join("gpio5").join("value");

    let mut line = Line::request(&sysfs, 5, "test").unwrap();
    line.full_open().unwrap();

    fs::remove_file(&value).unwrap();
    let err = line.set_direction_output(Level::High).unwrap_err();
    assert_eq!(err.attribute(), Some(Attribute::Value));
    assert_eq!(line.direction(), Some(Direction::Output));
    assert_eq!(line.value_handle().unwrap().access(), Access::ReadOnly);

    fs::write(&value, "1\n").unwrap();
    line.set_value(Level::Low).unwrap();
    assert_eq!(line.value_handle().unwrap().access(), Access::ReadWrite);
    assert_eq!(read(root.path(), 5, Attribute::Value), "0\n");
}

#[test]
fn stateless_operations_use_attribute_nodes() {
    let root = TempDir::new().unwrap();
    exported_line(root.path(), 8);
    let sysfs = Sysfs::with_root(root.path());

    assert!(sysfs.alterable_direction(8).unwrap());
    assert!(!sysfs.alterable_edge(9).unwrap());
    assert_eq!(sysfs.get_direction(8).unwrap(), Direction::Input);
    assert_eq!(sysfs.get_value(8).unwrap(), Level::Low);

    sysfs.set_edge(8, Trigger::Rising).unwrap();
    assert_eq!(sysfs.get_edge(8).unwrap(), Trigger::Rising);
    sysfs.set_active_low(8, true).unwrap();
    assert!(sysfs.get_active_low(8).unwrap());
}

#[test]
fn exports_and_unexports_owned_line() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("export"), "").unwrap();
    fs::write(root.path().join("unexport"), "").unwrap();
    let sysfs = Sysfs::with_root(root.path());

    let mut line = Line::request(&sysfs, 7, "test").unwrap();
    assert!(line.is_owned());
    assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "7\n");
    // Nothing appeared below the root, so no optional nodes were found
    assert!(!line.capabilities().alterable_direction);
    assert_eq!(line.direction(), None);

    line.release().unwrap();
    assert!(!line.is_owned());
    assert_eq!(
        fs::read_to_string(root.path().join("unexport")).unwrap(),
        "7\n"
    );
}

#[test]
fn missing_export_node_fails_request() {
    let root = TempDir::new().unwrap();
    let sysfs = Sysfs::with_root(root.path());

    let err = Line::request(&sysfs, 3, "test").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ExportFailed(_)));
    assert_eq!(err.line(), 3);
}

#[test]
fn from_env_defaults_to_kernel_root() {
    // Only checks the fallback; the variable itself is left alone to keep tests independent
    if std::env::var_os(gpio_sysfs::sysfs::ROOT_ENV).is_none() {
        assert_eq!(
            Sysfs::from_env().root(),
            Path::new(gpio_sysfs::sysfs::DEFAULT_ROOT)
        );
    }
}
