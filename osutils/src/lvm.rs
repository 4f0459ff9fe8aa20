//! Wrappers around the LVM2 command line tools.

use std::path::Path;

use anyhow::{Context, Error};

use bulwark_api::config::LvmSize;

use crate::dependencies::{is_execution_failure, Command, Dependency};

fn probe(cmd: Command, what: &str) -> Result<bool, Error> {
    match cmd.output_and_check() {
        Ok(_) => Ok(true),
        Err(e) if is_execution_failure(&e) => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to check whether {what} exists")),
    }
}

pub fn physical_volume_exists(device: &Path) -> Result<bool, Error> {
    let mut cmd = Dependency::Pvs.cmd();
    cmd.args(["--noheadings", "-o", "pv_name"]).arg(device);
    probe(cmd, &format!("physical volume '{}'", device.display()))
}

pub fn create_physical_volume(device: &Path) -> Result<(), Error> {
    Dependency::Pvcreate
        .cmd()
        .arg("-y")
        .arg(device)
        .run_and_check()
        .with_context(|| format!("Failed to create physical volume on '{}'", device.display()))
}

pub fn volume_group_exists(volume_group: &str) -> Result<bool, Error> {
    let mut cmd = Dependency::Vgs.cmd();
    cmd.args(["--noheadings", "-o", "vg_name", volume_group]);
    probe(cmd, &format!("volume group '{volume_group}'"))
}

pub fn create_volume_group(volume_group: &str, devices: &[&Path]) -> Result<(), Error> {
    Dependency::Vgcreate
        .cmd()
        .arg(volume_group)
        .args(devices)
        .run_and_check()
        .with_context(|| format!("Failed to create volume group '{volume_group}'"))
}

pub fn logical_volume_exists(volume_group: &str, logical_volume: &str) -> Result<bool, Error> {
    let mut cmd = Dependency::Lvs.cmd();
    cmd.args(["--noheadings", "-o", "lv_name"])
        .arg(format!("{volume_group}/{logical_volume}"));
    probe(
        cmd,
        &format!("logical volume '{volume_group}/{logical_volume}'"),
    )
}

pub(crate) fn create_logical_volume_args(
    volume_group: &str,
    logical_volume: &str,
    size: &LvmSize,
) -> Vec<String> {
    // Percentages go through -l as extents, everything else is a size for -L
    let (flag, value) = match size {
        LvmSize::PercentFree(percent) => ("-l", format!("{percent}%FREE")),
        LvmSize::Absolute(size) => ("-L", size.clone()),
    };
    vec![
        "-y".into(),
        "-n".into(),
        logical_volume.into(),
        flag.into(),
        value,
        volume_group.into(),
    ]
}

pub fn create_logical_volume(
    volume_group: &str,
    logical_volume: &str,
    size: &LvmSize,
) -> Result<(), Error> {
    Dependency::Lvcreate
        .cmd()
        .args(create_logical_volume_args(volume_group, logical_volume, size))
        .run_and_check()
        .with_context(|| {
            format!("Failed to create logical volume '{volume_group}/{logical_volume}'")
        })
}
