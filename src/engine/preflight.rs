//! Checks run before any step touches the host.

use log::debug;
use nix::unistd::Uid;

use bulwark_api::{
    config::{PoolBackendKind, ProvisionConfig},
    error::{BulwarkError, ExecutionEnvironmentMisconfigurationError},
};
use osutils::dependencies::Dependency;

pub fn check_root() -> Result<(), BulwarkError> {
    if !Uid::effective().is_root() {
        return Err(BulwarkError::new(
            ExecutionEnvironmentMisconfigurationError::MissingRequiredPermissions,
        ));
    }
    Ok(())
}

/// Tools the configured pipeline shells out to.
///
/// The database client tools are left out: they arrive with the packages the
/// pipeline installs.
pub fn required_tools(spec: &ProvisionConfig) -> Vec<Dependency> {
    let mut tools = Vec::new();

    if spec.storage.provision {
        if spec.storage.wipe_disks {
            tools.extend([Dependency::Wipefs, Dependency::Sgdisk]);
        }
        match spec.storage.backend {
            PoolBackendKind::Zfs => tools.extend([Dependency::Zpool, Dependency::Zfs]),
            PoolBackendKind::Lvm => tools.extend([
                Dependency::Pvs,
                Dependency::Pvcreate,
                Dependency::Vgs,
                Dependency::Vgcreate,
                Dependency::Lvs,
                Dependency::Lvcreate,
                Dependency::Blkid,
                Dependency::Mkfs,
            ]),
        }
    }

    tools.extend([
        Dependency::Mount,
        Dependency::Mountpoint,
        Dependency::Gpg,
        Dependency::AptGet,
        Dependency::DpkgQuery,
        Dependency::Systemctl,
        Dependency::Runuser,
    ]);

    let mut unique = Vec::with_capacity(tools.len());
    for tool in tools {
        if !unique.contains(&tool) {
            unique.push(tool);
        }
    }
    unique
}

/// Fails on the first required tool missing from `$PATH`.
pub fn check_tools(spec: &ProvisionConfig) -> Result<(), BulwarkError> {
    for tool in required_tools(spec) {
        let path = tool.path().map_err(|e| BulwarkError::from(*e))?;
        debug!("Found '{tool}' at '{}'", path.display());
    }
    Ok(())
}
