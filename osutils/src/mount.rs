use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Mounts whatever the fstab lists for `mount_point`.
pub fn mount_from_fstab(mount_point: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Mount
        .cmd()
        .arg(mount_point.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to mount '{}'", mount_point.as_ref().display()))
}

/// Makes the directory tree at `path` visible at `mount_dir` as well.
pub fn bind_mount(path: impl AsRef<Path>, mount_dir: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Mount
        .cmd()
        .arg("--bind")
        .arg(path.as_ref())
        .arg(mount_dir.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to mount {} as a bind mount for {}",
                path.as_ref().display(),
                mount_dir.as_ref().display(),
            )
        })
}
