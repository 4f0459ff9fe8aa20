use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Erases all filesystem, RAID and partition-table signatures on the device.
pub fn all(device: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Wipefs
        .cmd()
        .arg("--all")
        .arg("--force")
        .arg(device.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to wipe device '{}'", device.as_ref().display()))
}

/// Destroys the GPT and MBR data structures on the device, including the
/// backup GPT header at the end of the disk that wipefs leaves behind.
pub fn zap_partition_table(device: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Sgdisk
        .cmd()
        .arg("--zap-all")
        .arg(device.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to zap partition table of '{}'",
                device.as_ref().display()
            )
        })
}
