use std::path::Path;

use anyhow::Error;

use bulwark_api::{
    config::Storage,
    error::{ProvisioningError, ReportError},
};

use crate::{engine::Step, host::Host};

use super::PoolBackend;

/// A single-vdev ZFS pool with one dataset mounted at the pool mount path.
pub struct ZfsBackend<'a> {
    storage: &'a Storage,
}

impl<'a> ZfsBackend<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

impl<'a> PoolBackend<'a> for ZfsBackend<'a> {
    fn name(&self) -> &'static str {
        "ZFS"
    }

    fn pool_exists(&self, host: &mut dyn Host) -> Result<bool, Error> {
        host.zfs_pool_exists(&self.storage.zfs.pool)
    }

    fn mount_path(&self) -> &Path {
        &self.storage.mount_path
    }

    fn steps(&self) -> Vec<Step<'a>> {
        let storage = self.storage;
        let zfs = &storage.zfs;
        let dataset = zfs.dataset_name();

        vec![
            Step::new(
                format!("create ZFS pool '{}'", zfs.pool),
                move |host| host.zfs_pool_exists(&zfs.pool),
                move |host| {
                    host.zfs_create_pool(
                        &zfs.pool,
                        zfs.layout.vdev_keyword(),
                        zfs.ashift,
                        &storage.devices,
                    )
                    .structured(ProvisioningError::CreatePool {
                        pool: zfs.pool.clone(),
                    })
                },
            ),
            Step::new(
                format!("create ZFS dataset '{dataset}'"),
                {
                    let dataset = dataset.clone();
                    move |host| host.zfs_dataset_exists(&dataset)
                },
                {
                    let dataset = dataset.clone();
                    move |host| {
                        host.zfs_create_dataset(&dataset, &zfs.options)
                            .structured(ProvisioningError::CreateDataset {
                                dataset: dataset.clone(),
                            })
                    }
                },
            ),
            Step::new(
                format!("set mount point of '{dataset}'"),
                {
                    let dataset = dataset.clone();
                    move |host| {
                        Ok(Path::new(host.zfs_mountpoint(&dataset)?.as_str())
                            == storage.mount_path)
                    }
                },
                {
                    let dataset = dataset.clone();
                    move |host| {
                        host.zfs_set_mountpoint(&dataset, &storage.mount_path)
                            .structured(ProvisioningError::SetMountpoint {
                                dataset: dataset.clone(),
                            })
                    }
                },
            ),
            // A dataset mounted by an earlier run or by the ZFS import service
            // makes `zfs mount` fail, which is fine.
            Step::new(
                format!("mount '{dataset}'"),
                move |host| host.is_mountpoint(&storage.mount_path),
                move |host| {
                    host.zfs_mount(&dataset)
                        .structured(ProvisioningError::MountDataset {
                            dataset: dataset.clone(),
                        })
                },
            )
            .best_effort(),
        ]
    }
}
