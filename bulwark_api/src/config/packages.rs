use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    KEYRING_PATH_DEFAULT, PACKAGES_DEFAULT, PACKAGE_KEY_URL_DEFAULT, PACKAGE_REPO_URL_DEFAULT,
    SERIES_PLACEHOLDER, SOURCE_LIST_PATH_DEFAULT,
};

use super::{check_absolute, error::ConfigValidationError};

/// Third-party package repository and the packages installed from it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Packages {
    /// Release series to use instead of the one derived from the host OS.
    pub series: Option<String>,

    /// URL of the ASCII-armored signing key. May contain `{series}`.
    pub key_url: String,

    /// Repository base URL. May contain `{series}`.
    pub repo_url: String,

    /// Where the dearmored signing key is installed.
    pub keyring_path: PathBuf,

    /// Where the repository definition is written.
    pub source_list_path: PathBuf,

    /// Packages to install.
    pub packages: Vec<String>,
}

impl Default for Packages {
    fn default() -> Self {
        Self {
            series: None,
            key_url: PACKAGE_KEY_URL_DEFAULT.into(),
            repo_url: PACKAGE_REPO_URL_DEFAULT.into(),
            keyring_path: KEYRING_PATH_DEFAULT.into(),
            source_list_path: SOURCE_LIST_PATH_DEFAULT.into(),
            packages: PACKAGES_DEFAULT.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Packages {
    /// Returns the key URL for the given series.
    pub fn key_url_for(&self, series: &str) -> String {
        self.key_url.replace(SERIES_PLACEHOLDER, series)
    }

    /// Returns the repository URL for the given series.
    pub fn repo_url_for(&self, series: &str) -> String {
        self.repo_url.replace(SERIES_PLACEHOLDER, series)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigValidationError> {
        check_https("packages.keyUrl", &self.key_url)?;
        check_https("packages.repoUrl", &self.repo_url)?;
        check_absolute("packages.keyringPath", &self.keyring_path)?;
        check_absolute("packages.sourceListPath", &self.source_list_path)?;

        if self.packages.is_empty() {
            return Err(ConfigValidationError::NoPackages);
        }

        Ok(())
    }
}

/// Checks that the URL, with any placeholder filled in, parses and uses https.
fn check_https(field: &str, url: &str) -> Result<(), ConfigValidationError> {
    let parsed = Url::parse(&url.replace(SERIES_PLACEHOLDER, "series")).map_err(|_| {
        ConfigValidationError::InvalidUrl {
            field: field.into(),
            url: url.into(),
        }
    })?;

    if parsed.scheme() != "https" {
        return Err(ConfigValidationError::InsecureUrl {
            field: field.into(),
            url: url.into(),
        });
    }

    Ok(())
}
