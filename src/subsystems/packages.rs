//! Package repository registration and package installation.

use std::{cell::Cell, rc::Rc};

use log::{info, warn};

use bulwark_api::{
    config::Packages,
    constants::{PACKAGE_COMPONENT, SERIES_FALLBACK},
    error::{BulwarkError, ProvisioningError, ReportError},
};

use crate::{
    engine::{EngineContext, Step, Subsystem},
    host::Host,
};

/// Host OS `VERSION_ID` to package release series.
const SERIES_TABLE: &[(&str, &str)] = &[
    ("10", "buster"),
    ("11", "bullseye"),
    ("12", "bookworm"),
    ("13", "trixie"),
    ("20.04", "focal"),
    ("22.04", "jammy"),
    ("24.04", "noble"),
];

/// Looks up the release series for an OS `VERSION_ID`.
pub fn series_for_version(version_id: &str) -> Option<&'static str> {
    SERIES_TABLE
        .iter()
        .find(|(version, _)| *version == version_id)
        .map(|(_, series)| *series)
}

/// Picks the release series: an explicit override wins, then the
/// configuration, then the host OS version. Unknown versions fall back to a
/// default with a warning.
pub fn resolve_series(
    host: &mut dyn Host,
    packages: &Packages,
    series_override: Option<&str>,
) -> Result<String, BulwarkError> {
    if let Some(series) = series_override.or(packages.series.as_deref()) {
        info!("Using release series '{series}' from override");
        return Ok(series.to_string());
    }

    let version_id = host
        .os_release()
        .structured(ProvisioningError::ReadOsRelease)?
        .and_then(|os_release| os_release.version_id);

    match version_id.as_deref().and_then(series_for_version) {
        Some(series) => {
            info!("Using release series '{series}' for host OS version");
            Ok(series.to_string())
        }
        None => {
            warn!(
                "No known release series for host OS version '{}', falling back to \
                '{SERIES_FALLBACK}'; set 'packages.series' or pass '--series' to override",
                version_id.as_deref().unwrap_or("unknown")
            );
            Ok(SERIES_FALLBACK.to_string())
        }
    }
}

/// The repository definition written to the source list.
pub(crate) fn source_line(packages: &Packages, series: &str) -> String {
    format!(
        "deb [signed-by={}] {} {series} {PACKAGE_COMPONENT}\n",
        packages.keyring_path.display(),
        packages.repo_url_for(series),
    )
}

fn all_installed(host: &mut dyn Host, packages: &[String]) -> Result<bool, anyhow::Error> {
    for package in packages {
        if !host.package_installed(package)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Installs the packages, with one dependency repair and one retry.
fn install_with_retry(host: &mut dyn Host, packages: &[String]) -> Result<(), BulwarkError> {
    let Err(first) = host.install_packages(packages) else {
        return Ok(());
    };
    warn!("Package installation failed, repairing dependencies and retrying: {first:#}");

    if let Err(e) = host.fix_broken_packages() {
        warn!("Dependency repair failed: {e:#}");
    }

    host.install_packages(packages)
        .structured(ProvisioningError::InstallPackages)
}

pub struct PackageSubsystem;

impl Subsystem for PackageSubsystem {
    fn name(&self) -> &'static str {
        "packages"
    }

    fn steps<'a>(&self, ctx: &'a EngineContext) -> Vec<Step<'a>> {
        let packages = &ctx.spec.packages;
        let series = ctx.series.as_str();
        let source_written = Rc::new(Cell::new(false));

        vec![
            // The source is only written once its key is installed, so it can
            // never point at a key that was not fetched.
            Step::new(
                format!(
                    "register package source '{}'",
                    packages.source_list_path.display()
                ),
                move |host| {
                    let expected = source_line(packages, series);
                    Ok(host.read_file(&packages.source_list_path)?.as_deref()
                        == Some(expected.as_str())
                        && host.path_exists(&packages.keyring_path)?)
                },
                {
                    let source_written = source_written.clone();
                    move |host| {
                        let url = packages.key_url_for(series);
                        let key = host.download(&url).structured(
                            ProvisioningError::FetchSigningKey {
                                url: url.clone(),
                                series: series.to_string(),
                            },
                        )?;

                        host.install_keyring(&key, &packages.keyring_path)
                            .structured(ProvisioningError::InstallSigningKey {
                                path: packages.keyring_path.display().to_string(),
                            })?;

                        host.write_file(&packages.source_list_path, &source_line(packages, series))
                            .structured(ProvisioningError::WriteSourceList {
                                path: packages.source_list_path.display().to_string(),
                            })?;
                        source_written.set(true);
                        Ok(())
                    }
                },
            ),
            Step::new(
                "refresh package index",
                {
                    let source_written = source_written.clone();
                    move |host| {
                        Ok(!source_written.get() && all_installed(host, &packages.packages)?)
                    }
                },
                |host| {
                    host.update_package_index()
                        .structured(ProvisioningError::UpdatePackageIndex)
                },
            ),
            Step::new(
                "install packages",
                move |host| all_installed(host, &packages.packages),
                move |host| install_with_retry(host, &packages.packages),
            ),
        ]
    }
}
