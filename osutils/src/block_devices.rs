use std::{fs, os::unix::fs::FileTypeExt, path::Path};

use anyhow::{Context, Error};

/// Returns whether `path` resolves to a block device. Symlinks such as
/// `/dev/disk/by-id/*` are followed. A path that does not exist is not a
/// block device.
pub fn is_block_device(path: impl AsRef<Path>) -> Result<bool, Error> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.file_type().is_block_device()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to stat '{}'", path.display())),
    }
}
