//! Catalog database guard.
//!
//! The backup software stores its metadata in a PostgreSQL database that
//! must be UTF-8 encoded. A catalog created with any other encoding is either
//! rebuilt or reported, depending on [`RepairPolicy`].

use std::time::Duration;

use anyhow::Error;
use log::{debug, error, info, warn};

use bulwark_api::{
    config::{Catalog, RepairPolicy},
    constants::CATALOG_ENCODING,
    error::{BulwarkError, BulwarkResultExt, ProvisioningError, ReportError},
};

use crate::{
    engine::{EngineContext, Step, StepOutcome, Subsystem},
    host::Host,
};

/// Observed state of the catalog database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    Absent,
    PresentValid,
    PresentInvalid { encoding: String },
}

fn is_utf8(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case(CATALOG_ENCODING) || encoding.eq_ignore_ascii_case("UTF-8")
}

pub fn probe_catalog(host: &mut dyn Host, name: &str) -> Result<CatalogState, Error> {
    Ok(match host.database_encoding(name)? {
        None => CatalogState::Absent,
        Some(encoding) if is_utf8(&encoding) => CatalogState::PresentValid,
        Some(encoding) => CatalogState::PresentInvalid { encoding },
    })
}

/// Polls the database server until it answers or the attempts run out.
fn wait_for_database(host: &mut dyn Host, catalog: &Catalog) -> Result<(), BulwarkError> {
    let interval = Duration::from_secs(catalog.ready_interval_secs);
    for attempt in 1..=catalog.ready_attempts {
        match host.database_ready() {
            Ok(true) => {
                debug!("Database server answered on attempt {attempt}");
                return Ok(());
            }
            Ok(false) => debug!("Database server not ready, attempt {attempt}"),
            Err(e) => debug!("Database server not ready, attempt {attempt}: {e:#}"),
        }

        if attempt < catalog.ready_attempts {
            host.sleep(interval);
        }
    }

    Err(BulwarkError::new(ProvisioningError::DatabaseUnresponsive {
        attempts: catalog.ready_attempts,
    }))
}

fn verification_error(catalog: &Catalog, detail: String) -> BulwarkError {
    BulwarkError::new(ProvisioningError::CatalogVerification {
        name: catalog.name.clone(),
        detail,
    })
}

/// Checks that the catalog exists with the expected encoding and collation.
fn verify(host: &mut dyn Host, catalog: &Catalog) -> Result<(), BulwarkError> {
    let probe_error = || ProvisioningError::ProbeCatalog {
        name: catalog.name.clone(),
    };

    match host.database_encoding(&catalog.name).structured(probe_error())? {
        None => return Err(verification_error(catalog, "catalog does not exist".into())),
        Some(encoding) if !is_utf8(&encoding) => {
            return Err(verification_error(
                catalog,
                format!("encoding is '{encoding}', expected '{CATALOG_ENCODING}'"),
            ))
        }
        Some(_) => {}
    }

    let collation = host
        .database_collation(&catalog.name)
        .structured(probe_error())?;
    if collation.as_deref() != Some(catalog.locale.as_str()) {
        return Err(verification_error(
            catalog,
            format!(
                "collation is '{}', expected '{}'",
                collation.as_deref().unwrap_or("unknown"),
                catalog.locale
            ),
        ));
    }

    info!(
        "Catalog '{}' is {CATALOG_ENCODING} with locale '{}'",
        catalog.name, catalog.locale
    );
    Ok(())
}

/// Creates the catalog, loads its schema and verifies the result.
fn create_catalog(host: &mut dyn Host, catalog: &Catalog) -> Result<(), BulwarkError> {
    info!(
        "Creating catalog '{}' owned by '{}'",
        catalog.name, catalog.owner
    );
    host.create_database(&catalog.name, &catalog.owner, &catalog.locale)
        .structured(ProvisioningError::CreateCatalog {
            name: catalog.name.clone(),
        })?;

    for script in &catalog.schema_scripts {
        info!("Loading catalog schema with '{}'", script.display());
        host.run_database_script(script)
            .structured(ProvisioningError::LoadCatalogSchema {
                script: script.display().to_string(),
            })?;
    }

    verify(host, catalog)
}

/// Drops and recreates a catalog with the wrong encoding.
///
/// The dependent service must be down first, otherwise it reconnects while
/// the catalog is being rebuilt.
fn repair(host: &mut dyn Host, catalog: &Catalog) -> Result<(), BulwarkError> {
    let repair_error = || ProvisioningError::CatalogRepair {
        name: catalog.name.clone(),
    };
    let unit = &catalog.dependent_service;

    info!("Stopping '{unit}' before rebuilding catalog '{}'", catalog.name);
    if let Err(e) = host.stop_service(unit) {
        warn!("Failed to stop '{unit}': {e:#}");
    }

    if host.service_active(unit).structured(repair_error())? {
        return Err(BulwarkError::new(repair_error()))
            .message(format!("Service '{unit}' is still active"));
    }

    host.disconnect_sessions(&catalog.name)
        .structured(repair_error())?;
    host.drop_database(&catalog.name)
        .structured(repair_error())?;
    info!("Dropped catalog '{}'", catalog.name);

    create_catalog(host, catalog)
}

/// Brings the catalog to a UTF-8 state according to the repair policy.
///
/// Under [`RepairPolicy::Warn`] an invalid catalog is reported as deferred
/// rather than applied.
fn guard(host: &mut dyn Host, catalog: &Catalog) -> Result<StepOutcome, BulwarkError> {
    let state = probe_catalog(host, &catalog.name).structured(ProvisioningError::ProbeCatalog {
        name: catalog.name.clone(),
    })?;

    match state {
        CatalogState::PresentValid => Ok(StepOutcome::Applied),
        CatalogState::Absent => create_catalog(host, catalog).map(|()| StepOutcome::Applied),
        CatalogState::PresentInvalid { encoding } => {
            error!(
                "Catalog '{}' is encoded as '{encoding}' instead of {CATALOG_ENCODING}",
                catalog.name
            );
            match catalog.repair {
                RepairPolicy::Auto => repair(host, catalog).map(|()| StepOutcome::Applied),
                RepairPolicy::Warn => {
                    warn!(
                        "Leaving catalog '{}' untouched, manual intervention is required",
                        catalog.name
                    );
                    Ok(StepOutcome::Deferred {
                        cause: format!(
                            "catalog '{}' is encoded as '{encoding}' instead of {CATALOG_ENCODING}",
                            catalog.name
                        ),
                    })
                }
            }
        }
    }
}

pub struct CatalogSubsystem;

impl Subsystem for CatalogSubsystem {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn steps<'a>(&self, ctx: &'a EngineContext) -> Vec<Step<'a>> {
        let catalog = &ctx.spec.catalog;
        let unit = catalog.database_service.as_str();

        vec![
            Step::new(
                format!("start database service '{unit}'"),
                move |host| Ok(host.service_enabled(unit)? && host.service_active(unit)?),
                move |host| {
                    host.enable_service(unit)
                        .structured(ProvisioningError::StartDatabase { unit: unit.into() })
                },
            ),
            Step::gate("wait for database server", move |host| {
                wait_for_database(host, catalog)
            }),
            Step::new(
                format!("create role '{}'", catalog.owner),
                move |host| host.role_exists(&catalog.owner),
                move |host| {
                    host.create_role(&catalog.owner)
                        .structured(ProvisioningError::CreateRole {
                            role: catalog.owner.clone(),
                        })
                },
            ),
            Step::with_outcome(
                format!("ensure catalog '{}' is UTF-8", catalog.name),
                move |host| Ok(probe_catalog(host, &catalog.name)? == CatalogState::PresentValid),
                move |host| guard(host, catalog),
            ),
        ]
    }
}
