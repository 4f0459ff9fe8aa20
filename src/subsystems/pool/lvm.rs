use std::path::Path;

use anyhow::Error;

use bulwark_api::{
    config::{LvmSize, Storage},
    constants::POOL_MOUNT_OPTIONS,
    error::{BulwarkError, InternalError, ProvisioningError, ReportError},
};
use osutils::tabfile::{TabDevice, TabFileEntry};

use crate::{engine::Step, host::Host};

use super::PoolBackend;

/// One volume group across all devices, holding a single formatted logical
/// volume that is mounted through the fstab.
pub struct LvmBackend<'a> {
    storage: &'a Storage,
}

impl<'a> LvmBackend<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

impl<'a> PoolBackend<'a> for LvmBackend<'a> {
    fn name(&self) -> &'static str {
        "LVM"
    }

    fn pool_exists(&self, host: &mut dyn Host) -> Result<bool, Error> {
        host.volume_group_exists(&self.storage.lvm.volume_group)
    }

    fn mount_path(&self) -> &Path {
        &self.storage.mount_path
    }

    fn steps(&self) -> Vec<Step<'a>> {
        let storage = self.storage;
        let lvm = &storage.lvm;
        let mount_path = storage.mount_path.as_path();

        let mut steps: Vec<Step<'a>> = storage
            .devices
            .iter()
            .map(|device| {
                Step::new(
                    format!("create physical volume '{}'", device.display()),
                    move |host| host.physical_volume_exists(device),
                    move |host| {
                        host.create_physical_volume(device).structured(
                            ProvisioningError::CreatePhysicalVolume {
                                device: device.display().to_string(),
                            },
                        )
                    },
                )
            })
            .collect();

        steps.push(Step::new(
            format!("create volume group '{}'", lvm.volume_group),
            move |host| host.volume_group_exists(&lvm.volume_group),
            move |host| {
                host.create_volume_group(&lvm.volume_group, &storage.devices)
                    .structured(ProvisioningError::CreateVolumeGroup {
                        volume_group: lvm.volume_group.clone(),
                    })
            },
        ));

        steps.push(Step::new(
            format!("create logical volume '{}'", lvm.logical_volume),
            move |host| host.logical_volume_exists(&lvm.volume_group, &lvm.logical_volume),
            move |host| {
                // Validation guarantees a parseable size
                let size = lvm
                    .parsed_size()
                    .structured(InternalError::Internal("Unvalidated logical volume size"))?;
                create_logical_volume(host, &lvm.volume_group, &lvm.logical_volume, &size)
            },
        ));

        let device = lvm.device_path();
        steps.push(Step::new(
            format!("format '{}' as {}", device.display(), lvm.filesystem),
            {
                let device = device.clone();
                move |host| Ok(host.filesystem_type(&device)?.is_some())
            },
            {
                let device = device.clone();
                move |host| {
                    host.format(&device, &lvm.filesystem)
                        .structured(ProvisioningError::FormatVolume {
                            device: device.display().to_string(),
                        })
                }
            },
        ));

        // Keyed by UUID: device paths are not stable across reboots
        steps.push(Step::new(
            format!("register '{}' in fstab", mount_path.display()),
            {
                let device = device.clone();
                move |host| {
                    let uuid = host.filesystem_uuid(&device)?;
                    Ok(host
                        .read_fstab()?
                        .has_device(&TabDevice::Uuid(uuid.to_string())))
                }
            },
            move |host| {
                let register_error = || ProvisioningError::RegisterMount {
                    mount_point: mount_path.display().to_string(),
                };
                let uuid = host.filesystem_uuid(&device).structured(register_error())?;
                // A volume formatted by hand keeps its own filesystem type
                let fs_type = host
                    .filesystem_type(&device)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| lvm.filesystem.clone());
                let entry = TabFileEntry::new_uuid(&uuid, mount_path, &fs_type)
                    .with_options(
                        POOL_MOUNT_OPTIONS
                            .split(',')
                            .map(str::to_string)
                            .collect(),
                    );
                host.append_fstab(&entry).structured(register_error())
            },
        ));

        steps.push(Step::new(
            format!("create mount point '{}'", mount_path.display()),
            move |host| host.path_exists(mount_path),
            move |host| {
                host.create_dir_all(mount_path)
                    .structured(ProvisioningError::CreateDirectory {
                        path: mount_path.display().to_string(),
                    })
            },
        ));

        steps.push(Step::new(
            format!("mount '{}'", mount_path.display()),
            move |host| host.is_mountpoint(mount_path),
            move |host| {
                host.mount(mount_path)
                    .structured(ProvisioningError::MountVolume {
                        mount_point: mount_path.display().to_string(),
                    })
            },
        ));

        steps
    }
}

fn create_logical_volume(
    host: &mut dyn Host,
    volume_group: &str,
    logical_volume: &str,
    size: &LvmSize,
) -> Result<(), BulwarkError> {
    host.create_logical_volume(volume_group, logical_volume, size)
        .structured(ProvisioningError::CreateLogicalVolume {
            logical_volume: format!("{volume_group}/{logical_volume}"),
        })
}
