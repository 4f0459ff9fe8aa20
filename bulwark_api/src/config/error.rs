//! Validation errors for the provisioning configuration.

use serde::{Deserialize, Serialize};

/// Identifies errors detected during static validation of the configuration, i.e. errors that
/// can be detected without touching the host.
#[derive(thiserror::Error, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigValidationError {
    #[error("Storage provisioning is enabled but no devices are configured")]
    NoDevices,

    #[error("Device '{device}' is listed more than once")]
    DuplicateDevice { device: String },

    #[error("Layout '{layout}' needs at least {minimum} devices, but {count} are configured")]
    NotEnoughDevices {
        layout: String,
        minimum: usize,
        count: usize,
    },

    #[error("Path '{path}' for '{field}' must be absolute")]
    PathNotAbsolute { field: String, path: String },

    #[error("Bind-mount target '{path}' cannot be the pool mount path itself")]
    BindTargetIsSource { path: String },

    #[error("Name '{name}' for '{field}' contains invalid characters")]
    InvalidName { field: String, name: String },

    #[error("Database identifier '{name}' for '{field}' must match [a-z_][a-z0-9_]*")]
    InvalidIdentifier { field: String, name: String },

    #[error("Logical volume size '{size}' must be 'N%FREE' or a size such as '500G'")]
    InvalidVolumeSize { size: String },

    #[error("URL '{url}' for '{field}' must use https")]
    InsecureUrl { field: String, url: String },

    #[error("URL '{url}' for '{field}' is invalid")]
    InvalidUrl { field: String, url: String },

    #[error("No packages are configured for installation")]
    NoPackages,

    #[error("No core services are configured")]
    NoCoreServices,

    #[error("Database readiness attempts must be at least 1")]
    NoReadyAttempts,
}
