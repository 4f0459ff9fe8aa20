use std::fmt::{Debug, Write};
use std::{borrow::Cow, panic::Location};

use serde::{ser::SerializeStruct, Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::config::ConfigValidationError;

/// Bulwark failed to set itself up for the run.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InitializationError {
    #[error("Failed to read the wipe confirmation")]
    ReadConfirmation,
    #[error("Failed to write run report to '{path}'")]
    WriteReport { path: String },
}

/// Bulwark failed to run because the execution environment was misconfigured.
/// This is a user attributable error as it relates to the environment in which
/// Bulwark is running, which is user defined.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionEnvironmentMisconfigurationError {
    #[error("Provisioning requires root privileges")]
    MissingRequiredPermissions,
    #[error("Required binary '{binary}' was not found, install it and run again")]
    MissingBinary { binary: &'static str },
}

/// User provided input was invalid.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidInputError {
    #[error("Failed to load configuration file from '{path}'")]
    LoadConfig { path: String },
    #[error("Failed to parse configuration")]
    ParseConfig,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),
    #[error("Configured device '{path}' is not a block device")]
    InvalidBlockDevice { path: String },
    #[error("Disk wipe was not confirmed, expected the literal '{expected}'")]
    WipeNotConfirmed { expected: &'static str },
}

/// A provisioning step failed. Every variant names the resource it was acting on.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningError {
    #[error("Failed to create ZFS pool '{pool}'")]
    CreatePool { pool: String },
    #[error("Failed to create ZFS dataset '{dataset}'")]
    CreateDataset { dataset: String },
    #[error("Failed to set mount point of ZFS dataset '{dataset}'")]
    SetMountpoint { dataset: String },
    #[error("Failed to mount ZFS dataset '{dataset}'")]
    MountDataset { dataset: String },
    #[error("Failed to create LVM physical volume on '{device}'")]
    CreatePhysicalVolume { device: String },
    #[error("Failed to create LVM volume group '{volume_group}'")]
    CreateVolumeGroup { volume_group: String },
    #[error("Failed to create LVM logical volume '{logical_volume}'")]
    CreateLogicalVolume { logical_volume: String },
    #[error("Failed to format '{device}'")]
    FormatVolume { device: String },
    #[error("Failed to register persistent mount for '{mount_point}'")]
    RegisterMount { mount_point: String },
    #[error("Failed to mount '{mount_point}'")]
    MountVolume { mount_point: String },
    #[error("Failed to create directory '{path}'")]
    CreateDirectory { path: String },
    #[error("Failed to bind-mount '{source_path}' onto '{target}'")]
    BindMount { source_path: String, target: String },
    #[error("Failed to change ownership of '{path}' to '{owner}'")]
    ChangeOwnership { path: String, owner: String },
    #[error("Failed to read host OS release information")]
    ReadOsRelease,
    #[error(
        "Failed to fetch signing key from '{url}' for series '{series}'. The repository may not \
        publish packages for this series yet; set 'packages.series' or pass '--series' to \
        override it"
    )]
    FetchSigningKey { url: String, series: String },
    #[error("Failed to install signing key to '{path}'")]
    InstallSigningKey { path: String },
    #[error("Failed to write package source '{path}'")]
    WriteSourceList { path: String },
    #[error("Failed to update package index")]
    UpdatePackageIndex,
    #[error("Failed to install packages after a dependency repair and one retry")]
    InstallPackages,
    #[error("Failed to start database service '{unit}'")]
    StartDatabase { unit: String },
    #[error("Database server did not answer after {attempts} attempts")]
    DatabaseUnresponsive { attempts: u32 },
    #[error("Failed to create database role '{role}'")]
    CreateRole { role: String },
    #[error("Failed to query state of catalog '{name}'")]
    ProbeCatalog { name: String },
    #[error("Failed to create catalog '{name}'")]
    CreateCatalog { name: String },
    #[error("Failed to load catalog schema with '{script}'")]
    LoadCatalogSchema { script: String },
    #[error("Failed to repair catalog '{name}'")]
    CatalogRepair { name: String },
    #[error("Catalog '{name}' failed verification: {detail}")]
    CatalogVerification { name: String, detail: String },
    #[error("Failed to enable and start service '{unit}'")]
    StartService { unit: String },
}

#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InternalError {
    #[error("Internal error: {0}")]
    Internal(&'static str),
    #[error("Bulwark panicked: {0}")]
    Panic(String),
}

/// Each variant of `ErrorKind` corresponds to a different category of error. The categories are
/// intended to be user-meaningful and to tell the operator where to look first.
#[derive(Debug, Eq, thiserror::Error, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// Bulwark failed to initialize.
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// Bulwark failed to run because the execution environment was misconfigured.
    #[error(transparent)]
    ExecutionEnvironmentMisconfiguration(#[from] ExecutionEnvironmentMisconfigurationError),

    /// Bulwark failed because it was provided invalid user input.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// Some provisioning step failed. The host is left partially provisioned; fix the cause and
    /// run again.
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// A bug was encountered.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug)]
struct BulwarkErrorInner {
    kind: ErrorKind,
    location: &'static Location<'static>,
    source: Option<anyhow::Error>,
    context: Vec<(Cow<'static, str>, &'static Location<'static>)>,
}

pub struct BulwarkError(Box<BulwarkErrorInner>);
impl BulwarkError {
    #[track_caller]
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        BulwarkError(Box::new(BulwarkErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: None,
            context: Vec::new(),
        }))
    }

    #[track_caller]
    pub fn with_source(kind: impl Into<ErrorKind>, source: anyhow::Error) -> Self {
        BulwarkError(Box::new(BulwarkErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: Some(source),
            context: Vec::new(),
        }))
    }

    /// Returns a reference to the inner ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }
}

pub trait ReportError<T, K> {
    /// Convert this error into a structured BulwarkError.
    fn structured(self, kind: K) -> Result<T, BulwarkError>;
}

impl<T, K> ReportError<T, K> for Option<T>
where
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, BulwarkError> {
        match self {
            Some(t) => Ok(t),
            None => Err(BulwarkError::new(kind)),
        }
    }
}

impl<T, E, K> ReportError<T, K> for Result<T, E>
where
    E: Into<anyhow::Error>,
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, BulwarkError> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(BulwarkError::with_source(kind, e.into())),
        }
    }
}

pub trait BulwarkResultExt<T> {
    /// Attach a context message to the error.
    fn message(self, context: impl Into<Cow<'static, str>>) -> Result<T, BulwarkError>;
}

impl<T> BulwarkResultExt<T> for Result<T, BulwarkError> {
    #[track_caller]
    fn message(mut self, context: impl Into<Cow<'static, str>>) -> Result<T, BulwarkError> {
        if let Err(ref mut e) = self {
            e.0.context.push((context.into(), Location::caller()));
        }
        self
    }
}

impl Serialize for BulwarkError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("bulwark-error", 5)?;
        state.serialize_field("message", &self.0.kind.to_string())?;
        match self.0.kind {
            ErrorKind::Initialization(ref e) => state.serialize_field("error", e)?,
            ErrorKind::ExecutionEnvironmentMisconfiguration(ref e) => {
                state.serialize_field("error", e)?
            }
            ErrorKind::InvalidInput(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Provisioning(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Internal(ref e) => state.serialize_field("error", e)?,
        }
        state.serialize_field("category", <&str>::from(&self.0.kind))?;
        state.serialize_field(
            "location",
            &format!("{}:{}", self.0.location.file(), self.0.location.line()),
        )?;
        match self.0.source {
            Some(ref e) => state.serialize_field("cause", &Some(format!("{:?}", e)))?,
            None => state.serialize_field("cause", &None::<String>)?,
        }
        state.end()
    }
}

impl Debug for BulwarkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.0.kind,
            self.0.location.file(),
            self.0.location.line()
        )?;

        if !self.0.context.is_empty() {
            writeln!(f, "\n\nContext:")?;
            for (i, (context, location)) in self.0.context.iter().enumerate() {
                for (j, line) in context.split('\n').enumerate() {
                    if j == 0 {
                        write!(f, "{: >5}: ", i)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                writeln!(f, " at {}:{}", location.file(), location.line())?;
            }
        }

        if let Some(ref source) = self.0.source {
            writeln!(f, "\n\nCaused by:")?;
            let mut index = 0;
            let mut source: Option<&dyn std::error::Error> = Some(source.as_ref());
            while let Some(e) = source {
                for (i, line) in e.to_string().split('\n').enumerate() {
                    if i == 0 {
                        write!(f, "{: >5}: ", index)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                f.write_char('\n')?;
                source = e.source();
                index += 1;
            }
        }
        Ok(())
    }
}
