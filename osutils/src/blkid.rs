use std::path::Path;

use anyhow::{Context, Error};
use uuid::Uuid;

use crate::dependencies::{is_execution_failure, Dependency};

fn run(device_path: impl AsRef<Path>, tag: &str) -> Result<String, Error> {
    let output = Dependency::Blkid
        .cmd()
        .arg("-o") // output format
        .arg("value") // single value
        .arg("-s") // tag
        .arg(tag)
        .arg(device_path.as_ref())
        .output_and_check()
        .context("Failed to execute blkid")?;

    Ok(output.trim().to_owned())
}

/// Returns the filesystem type recorded on the device, or None when blkid
/// finds no recognizable signature.
///
/// blkid exits with status 2 when the device carries no signature, which is
/// the normal state of a freshly created volume.
pub fn get_filesystem_type(device_path: impl AsRef<Path>) -> Result<Option<String>, Error> {
    let output = Dependency::Blkid
        .cmd()
        .arg("-o")
        .arg("value")
        .arg("-s")
        .arg("TYPE")
        .arg(device_path.as_ref())
        .output_and_check();

    match output {
        Ok(fs_type) => Ok(parse_filesystem_type(&fs_type)),
        Err(e) if is_execution_failure(&e) => Ok(None),
        Err(e) => Err(e).with_context(|| {
            format!(
                "Failed to read filesystem type of '{}'",
                device_path.as_ref().display()
            )
        }),
    }
}

fn parse_filesystem_type(output: &str) -> Option<String> {
    match output.trim() {
        "" => None,
        fs_type => Some(fs_type.to_owned()),
    }
}

pub fn get_filesystem_uuid(device_path: impl AsRef<Path>) -> Result<Uuid, Error> {
    let output = run(&device_path, "UUID")?;
    Uuid::parse_str(output.as_str()).context(format!(
        "Failed to get UUID for path '{}', received '{}'",
        device_path.as_ref().display(),
        output
    ))
}
