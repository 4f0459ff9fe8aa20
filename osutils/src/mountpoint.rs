use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::{is_execution_failure, Dependency};

pub fn check_is_mountpoint(path: impl AsRef<Path>) -> Result<bool, Error> {
    let output = Dependency::Mountpoint
        .cmd()
        .arg("--quiet")
        .arg(path.as_ref())
        .run_and_check();
    match output {
        Ok(()) => Ok(true),
        Err(e) if is_execution_failure(&e) => Ok(false),
        Err(e) => Err(e).with_context(|| {
            format!(
                "Failed to determine if '{}' is a mount point.",
                path.as_ref().display()
            )
        }),
    }
}
