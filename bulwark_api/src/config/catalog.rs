use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CATALOG_LOCALE_DEFAULT, CATALOG_NAME_DEFAULT, CATALOG_OWNER_DEFAULT,
    CATALOG_SCHEMA_SCRIPTS_DEFAULT, DATABASE_READY_ATTEMPTS_DEFAULT,
    DATABASE_READY_INTERVAL_SECS_DEFAULT, DATABASE_SERVICE_DEFAULT, DIRECTOR_SERVICE,
};

use super::{check_absolute, check_identifier, check_name, error::ConfigValidationError};

/// The backup software's relational metadata database.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Catalog {
    /// Database name.
    pub name: String,

    /// Role owning the database.
    pub owner: String,

    /// Locale used for both LC_COLLATE and LC_CTYPE.
    pub locale: String,

    /// What to do with an existing catalog that is not UTF-8.
    pub repair: RepairPolicy,

    /// Unit name of the database server.
    pub database_service: String,

    /// Unit that holds catalog connections and must be stopped before a repair.
    pub dependent_service: String,

    /// Scripts run as the database superuser after the catalog is created.
    pub schema_scripts: Vec<PathBuf>,

    /// Number of times the database server is probed before giving up.
    pub ready_attempts: u32,

    /// Seconds between readiness probes.
    pub ready_interval_secs: u64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            name: CATALOG_NAME_DEFAULT.into(),
            owner: CATALOG_OWNER_DEFAULT.into(),
            locale: CATALOG_LOCALE_DEFAULT.into(),
            repair: RepairPolicy::default(),
            database_service: DATABASE_SERVICE_DEFAULT.into(),
            dependent_service: DIRECTOR_SERVICE.into(),
            schema_scripts: CATALOG_SCHEMA_SCRIPTS_DEFAULT
                .iter()
                .map(PathBuf::from)
                .collect(),
            ready_attempts: DATABASE_READY_ATTEMPTS_DEFAULT,
            ready_interval_secs: DATABASE_READY_INTERVAL_SECS_DEFAULT,
        }
    }
}

/// Policy applied when an existing catalog reports a non-UTF-8 encoding.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RepairPolicy {
    /// Stop the dependent service, drop the catalog and recreate it.
    #[default]
    Auto,

    /// Report the defect and leave the catalog untouched.
    Warn,
}

impl Catalog {
    pub(crate) fn validate(&self) -> Result<(), ConfigValidationError> {
        check_identifier("catalog.name", &self.name)?;
        check_identifier("catalog.owner", &self.owner)?;
        check_name("catalog.locale", &self.locale)?;
        check_name("catalog.databaseService", &self.database_service)?;
        check_name("catalog.dependentService", &self.dependent_service)?;
        for script in &self.schema_scripts {
            check_absolute("catalog.schemaScripts", script)?;
        }

        if self.ready_attempts == 0 {
            return Err(ConfigValidationError::NoReadyAttempts);
        }

        Ok(())
    }
}
