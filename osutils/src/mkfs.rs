use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Creates a filesystem of the given type on a device.
pub fn run(device_path: &Path, filesystem: &str) -> Result<(), Error> {
    Dependency::Mkfs
        .cmd()
        .arg("--type")
        .arg(filesystem)
        .arg(device_path)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create {filesystem} filesystem on '{}'",
                device_path.display()
            )
        })
}
