use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        AUXILIARY_SERVICES_DEFAULT, BACKUP_GROUP_DEFAULT, BACKUP_USER_DEFAULT,
        BIND_TARGET_PATH_DEFAULT, CORE_SERVICES_DEFAULT,
    },
    error::{BulwarkError, InvalidInputError, ReportError},
    is_default,
};

mod catalog;
mod error;
mod packages;
mod storage;

pub use catalog::{Catalog, RepairPolicy};
pub use error::ConfigValidationError;
pub use packages::Packages;
pub use storage::{LvmSettings, LvmSize, PoolBackendKind, Storage, ZfsLayout, ZfsSettings};

lazy_static! {
    static ref NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.+-]+$").unwrap();
    static ref IDENTIFIER_REGEX: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
}

/// Complete description of the backup server to provision. Read once at start
/// and never modified afterwards.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Storage pool construction.
    #[serde(default)]
    pub storage: Storage,

    /// Bind mount exposing the pool where the backup software expects it.
    #[serde(default, skip_serializing_if = "is_default")]
    pub bind_mount: BindMount,

    /// Package repository and packages.
    #[serde(default)]
    pub packages: Packages,

    /// Catalog database.
    #[serde(default)]
    pub catalog: Catalog,

    /// Services to enable and start.
    #[serde(default, skip_serializing_if = "is_default")]
    pub services: Services,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BindMount {
    /// Directory the pool is bind-mounted onto.
    pub target: PathBuf,

    /// User the target directory is handed to.
    pub owner: String,

    /// Group the target directory is handed to.
    pub group: String,
}

impl Default for BindMount {
    fn default() -> Self {
        Self {
            target: BIND_TARGET_PATH_DEFAULT.into(),
            owner: BACKUP_USER_DEFAULT.into(),
            group: BACKUP_GROUP_DEFAULT.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Services {
    /// Units the backup system cannot work without. Failing to start one is fatal.
    pub core: Vec<String>,

    /// Presentation-layer units. Failing to start one is only reported.
    pub auxiliary: Vec<String>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            core: CORE_SERVICES_DEFAULT.iter().map(|s| s.to_string()).collect(),
            auxiliary: AUXILIARY_SERVICES_DEFAULT
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ProvisionConfig {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BulwarkError> {
        let path = path.as_ref();
        debug!("Loading configuration from '{}'", path.display());
        let contents =
            std::fs::read_to_string(path).structured(InvalidInputError::LoadConfig {
                path: path.display().to_string(),
            })?;

        Self::from_yaml(&contents)
    }

    /// Parses and validates a YAML configuration document.
    pub fn from_yaml(contents: &str) -> Result<Self, BulwarkError> {
        // An empty document means "all defaults"
        let config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents).structured(InvalidInputError::ParseConfig)?
        };

        config
            .validate()
            .map_err(|e| BulwarkError::new(InvalidInputError::InvalidConfig(e)))?;

        Ok(config)
    }

    /// Static validation: everything that can be checked without touching the host.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.storage.validate()?;

        check_absolute("bindMount.target", &self.bind_mount.target)?;
        if self.bind_mount.target == self.storage.mount_path {
            return Err(ConfigValidationError::BindTargetIsSource {
                path: self.bind_mount.target.display().to_string(),
            });
        }
        check_name("bindMount.owner", &self.bind_mount.owner)?;
        check_name("bindMount.group", &self.bind_mount.group)?;

        self.packages.validate()?;
        self.catalog.validate()?;

        if self.services.core.is_empty() {
            return Err(ConfigValidationError::NoCoreServices);
        }
        for unit in self.services.core.iter().chain(&self.services.auxiliary) {
            check_name("services", unit)?;
        }

        Ok(())
    }
}

pub(crate) fn check_absolute(field: &str, path: &Path) -> Result<(), ConfigValidationError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(ConfigValidationError::PathNotAbsolute {
            field: field.into(),
            path: path.display().to_string(),
        })
    }
}

pub(crate) fn check_name(field: &str, name: &str) -> Result<(), ConfigValidationError> {
    if NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidName {
            field: field.into(),
            name: name.into(),
        })
    }
}

pub(crate) fn check_identifier(field: &str, name: &str) -> Result<(), ConfigValidationError> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidIdentifier {
            field: field.into(),
            name: name.into(),
        })
    }
}
