//! Wrappers around the `zpool` and `zfs` commands.
//!
//! Existence probes map a failed listing to "absent": both tools exit with
//! status 1 when the named pool or dataset does not exist.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Error};

use crate::dependencies::{is_execution_failure, Command, Dependency};

/// Runs a listing command and reports whether it succeeded.
fn probe(cmd: Command, what: &str) -> Result<bool, Error> {
    match cmd.output_and_check() {
        Ok(_) => Ok(true),
        Err(e) if is_execution_failure(&e) => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to check whether {what} exists")),
    }
}

pub fn pool_exists(pool: &str) -> Result<bool, Error> {
    let mut cmd = Dependency::Zpool.cmd();
    cmd.args(["list", "-H", "-o", "name", pool]);
    probe(cmd, &format!("ZFS pool '{pool}'"))
}

/// Builds the `zpool create` argument list.
///
/// The pool root is created with `mountpoint=none` so only the dataset is
/// ever mounted.
pub(crate) fn create_pool_args(
    pool: &str,
    vdev: Option<&str>,
    ashift: u8,
    devices: &[&Path],
) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "-f".into(),
        "-o".into(),
        format!("ashift={ashift}"),
        "-m".into(),
        "none".into(),
        pool.into(),
    ];
    if let Some(vdev) = vdev {
        args.push(vdev.into());
    }
    args.extend(devices.iter().map(|d| d.to_string_lossy().to_string()));
    args
}

pub fn create_pool(pool: &str, vdev: Option<&str>, ashift: u8, devices: &[&Path]) -> Result<(), Error> {
    Dependency::Zpool
        .cmd()
        .args(create_pool_args(pool, vdev, ashift, devices))
        .run_and_check()
        .with_context(|| format!("Failed to create ZFS pool '{pool}'"))
}

pub fn dataset_exists(dataset: &str) -> Result<bool, Error> {
    let mut cmd = Dependency::Zfs.cmd();
    cmd.args(["list", "-H", "-o", "name", dataset]);
    probe(cmd, &format!("ZFS dataset '{dataset}'"))
}

pub(crate) fn create_dataset_args(dataset: &str, options: &BTreeMap<String, String>) -> Vec<String> {
    let mut args = vec!["create".to_string()];
    for (key, value) in options {
        args.push("-o".into());
        args.push(format!("{key}={value}"));
    }
    args.push(dataset.into());
    args
}

pub fn create_dataset(dataset: &str, options: &BTreeMap<String, String>) -> Result<(), Error> {
    Dependency::Zfs
        .cmd()
        .args(create_dataset_args(dataset, options))
        .run_and_check()
        .with_context(|| format!("Failed to create ZFS dataset '{dataset}'"))
}

/// Reads a single property value of a dataset.
pub fn get_property(dataset: &str, property: &str) -> Result<String, Error> {
    Ok(Dependency::Zfs
        .cmd()
        .args(["get", "-H", "-o", "value", property, dataset])
        .output_and_check()
        .with_context(|| format!("Failed to read property '{property}' of '{dataset}'"))?
        .trim()
        .to_owned())
}

pub fn set_property(dataset: &str, property: &str, value: &str) -> Result<(), Error> {
    Dependency::Zfs
        .cmd()
        .arg("set")
        .arg(format!("{property}={value}"))
        .arg(dataset)
        .run_and_check()
        .with_context(|| format!("Failed to set '{property}={value}' on '{dataset}'"))
}

pub fn mount(dataset: &str) -> Result<(), Error> {
    Dependency::Zfs
        .cmd()
        .args(["mount", dataset])
        .run_and_check()
        .with_context(|| format!("Failed to mount ZFS dataset '{dataset}'"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_create_pool_args() {
        let devices = [PathBuf::from("/dev/sdb"), PathBuf::from("/dev/sdc")];
        let devices: Vec<&Path> = devices.iter().map(PathBuf::as_path).collect();

        assert_eq!(
            create_pool_args("backup", Some("mirror"), 12, &devices),
            vec![
                "create", "-f", "-o", "ashift=12", "-m", "none", "backup", "mirror", "/dev/sdb",
                "/dev/sdc"
            ]
        );

        assert_eq!(
            create_pool_args("backup", None, 9, &devices[..1]),
            vec!["create", "-f", "-o", "ashift=9", "-m", "none", "backup", "/dev/sdb"]
        );
    }

    #[test]
    fn test_create_dataset_args() {
        let options = [("compression", "lz4"), ("atime", "off")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert_eq!(
            create_dataset_args("backup/bacula", &options),
            vec![
                "create",
                "-o",
                "atime=off",
                "-o",
                "compression=lz4",
                "backup/bacula"
            ]
        );
    }
}
