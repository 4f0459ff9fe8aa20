use std::{io::Write, path::Path};

use anyhow::{Context, Error};

use crate::{dependencies::Dependency, files};

/// Converts an ASCII-armored public key into a binary keyring at `keyring`,
/// replacing any existing file.
pub fn dearmor(armored: &[u8], keyring: &Path) -> Result<(), Error> {
    if let Some(parent) = keyring.parent() {
        files::create_dirs(parent)?;
    }

    let mut armored_file =
        tempfile::NamedTempFile::new().context("Failed to create temporary key file")?;
    armored_file
        .write_all(armored)
        .context("Failed to write armored key to temporary file")?;

    Dependency::Gpg
        .cmd()
        .args(["--batch", "--yes", "--dearmor", "--output"])
        .arg(keyring)
        .arg(armored_file.path())
        .run_and_check()
        .with_context(|| format!("Failed to dearmor signing key into '{}'", keyring.display()))
}
