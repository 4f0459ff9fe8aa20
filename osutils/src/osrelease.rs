use anyhow::{Context, Error};
use const_format::formatcp;

/// Absolute path to the /etc/os-release file.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Represents the contents of the /etc/os-release file.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version_id: Option<String>,
    pub version_codename: Option<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Reads the contents of /etc/os-release and parses it into an OsRelease struct.
    pub fn read() -> Result<Self, Error> {
        Ok(Self::parse(
            &std::fs::read_to_string(OS_RELEASE_PATH)
                .context(formatcp!("Failed to read '{OS_RELEASE_PATH}'"))?,
        ))
    }

    /// Parses the input string into an OsRelease struct.
    pub fn parse(data: &str) -> Self {
        let mut os_release = OsRelease::default();
        for line in data.lines() {
            if line.is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            let Some((key, raw_value)) = line.trim().split_once('=') else {
                continue;
            };

            let value = || {
                Some(
                    raw_value
                        .trim()
                        .trim_matches('\"')
                        .trim_matches('\'')
                        .to_string(),
                )
                .filter(|v| !v.is_empty())
            };

            match key {
                "ID" => os_release.id = value(),
                "NAME" => os_release.name = value(),
                "VERSION_ID" => os_release.version_id = value(),
                "VERSION_CODENAME" => os_release.version_codename = value(),
                "PRETTY_NAME" => os_release.pretty_name = value(),
                _ => {}
            }
        }

        os_release
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_parse_debian() {
        let os_release = OsRelease::parse(indoc! {r#"
            PRETTY_NAME="Debian GNU/Linux 12 (bookworm)"
            NAME="Debian GNU/Linux"
            VERSION_ID="12"
            VERSION="12 (bookworm)"
            VERSION_CODENAME=bookworm
            ID=debian
        "#});

        assert_eq!(
            os_release,
            OsRelease {
                id: Some("debian".into()),
                name: Some("Debian GNU/Linux".into()),
                version_id: Some("12".into()),
                version_codename: Some("bookworm".into()),
                pretty_name: Some("Debian GNU/Linux 12 (bookworm)".into()),
            }
        );
    }

    #[test]
    fn test_parse_sparse() {
        let os_release = OsRelease::parse(indoc! {r#"
            # comment
            ID='ubuntu'
            VERSION_ID=""
            garbage
        "#});

        assert_eq!(os_release.id.as_deref(), Some("ubuntu"));
        assert_eq!(os_release.version_id, None);
        assert_eq!(os_release.version_codename, None);
    }
}
