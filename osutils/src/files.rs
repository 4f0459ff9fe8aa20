use std::path::Path;

use anyhow::{Context, Error};
use nix::unistd::{chown, Group, User};

/// Creates all directories in a path if they don't exist
pub fn create_dirs<S>(path: S) -> Result<(), Error>
where
    S: AsRef<Path>,
{
    std::fs::create_dir_all(path.as_ref()).context(format!(
        "Could not create path: {}",
        path.as_ref().display()
    ))
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub fn write_file<S>(path: S, contents: &[u8]) -> Result<(), Error>
where
    S: AsRef<Path>,
{
    if let Some(parent) = path.as_ref().parent() {
        create_dirs(parent)?;
    }

    std::fs::write(path.as_ref(), contents)
        .with_context(|| format!("Could not write file: {}", path.as_ref().display()))
}

/// Reads a file, returning None when it does not exist.
pub fn read_optional<S>(path: S) -> Result<Option<String>, Error>
where
    S: AsRef<Path>,
{
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            Err(e).with_context(|| format!("Could not read file: {}", path.as_ref().display()))
        }
    }
}

/// Changes ownership of `path` to the named user and group.
pub fn chown_by_name<S>(path: S, user: &str, group: &str) -> Result<(), Error>
where
    S: AsRef<Path>,
{
    let uid = User::from_name(user)
        .with_context(|| format!("Failed to look up user '{user}'"))?
        .with_context(|| format!("User '{user}' does not exist"))?
        .uid;
    let gid = Group::from_name(group)
        .with_context(|| format!("Failed to look up group '{group}'"))?
        .with_context(|| format!("Group '{group}' does not exist"))?
        .gid;

    chown(path.as_ref(), Some(uid), Some(gid)).with_context(|| {
        format!(
            "Failed to change ownership of '{}' to {user}:{group}",
            path.as_ref().display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.list");

        write_file(&path, b"deb x y main\n").unwrap();
        assert_eq!(
            read_optional(&path).unwrap().as_deref(),
            Some("deb x y main\n")
        );
    }

    #[test]
    fn test_read_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_optional(dir.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn test_chown_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let err = chown_by_name(dir.path(), "bulwark-no-such-user", "root").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
