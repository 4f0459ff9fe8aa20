//! Capability interface between the provisioning logic and the machine it
//! runs on.
//!
//! Every probe and mutation the pipeline performs goes through [`Host`], one
//! method per resource kind. [`LiveHost`] shells out through osutils; tests
//! substitute an in-memory fake.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Error};
use inquire::Text;
use uuid::Uuid;

use bulwark_api::config::LvmSize;
use osutils::{
    apt, blkid, block_devices, files, gpg, lvm, mkfs, mount, mountpoint,
    osrelease::OsRelease,
    psql, systemctl,
    tabfile::{self, TabFile, TabFileEntry},
    wipefs, zfs,
};

use crate::io_utils::http;

#[cfg(test)]
pub(crate) mod fake;

pub trait Host {
    // Disks
    fn is_block_device(&mut self, path: &Path) -> Result<bool, Error>;
    /// Shows `prompt` to the operator and returns the raw answer.
    fn confirm(&mut self, prompt: &str) -> Result<String, Error>;
    fn wipe_signatures(&mut self, device: &Path) -> Result<(), Error>;
    fn zap_partition_table(&mut self, device: &Path) -> Result<(), Error>;

    // ZFS
    fn zfs_pool_exists(&mut self, pool: &str) -> Result<bool, Error>;
    fn zfs_create_pool(
        &mut self,
        pool: &str,
        vdev: Option<&str>,
        ashift: u8,
        devices: &[PathBuf],
    ) -> Result<(), Error>;
    fn zfs_dataset_exists(&mut self, dataset: &str) -> Result<bool, Error>;
    fn zfs_create_dataset(
        &mut self,
        dataset: &str,
        options: &BTreeMap<String, String>,
    ) -> Result<(), Error>;
    fn zfs_mountpoint(&mut self, dataset: &str) -> Result<String, Error>;
    fn zfs_set_mountpoint(&mut self, dataset: &str, path: &Path) -> Result<(), Error>;
    fn zfs_mount(&mut self, dataset: &str) -> Result<(), Error>;

    // LVM
    fn physical_volume_exists(&mut self, device: &Path) -> Result<bool, Error>;
    fn create_physical_volume(&mut self, device: &Path) -> Result<(), Error>;
    fn volume_group_exists(&mut self, volume_group: &str) -> Result<bool, Error>;
    fn create_volume_group(&mut self, volume_group: &str, devices: &[PathBuf])
        -> Result<(), Error>;
    fn logical_volume_exists(
        &mut self,
        volume_group: &str,
        logical_volume: &str,
    ) -> Result<bool, Error>;
    fn create_logical_volume(
        &mut self,
        volume_group: &str,
        logical_volume: &str,
        size: &LvmSize,
    ) -> Result<(), Error>;

    // Filesystems and mounts
    fn filesystem_type(&mut self, device: &Path) -> Result<Option<String>, Error>;
    fn filesystem_uuid(&mut self, device: &Path) -> Result<Uuid, Error>;
    fn format(&mut self, device: &Path, filesystem: &str) -> Result<(), Error>;
    fn read_fstab(&mut self) -> Result<TabFile, Error>;
    fn append_fstab(&mut self, entry: &TabFileEntry) -> Result<(), Error>;
    fn is_mountpoint(&mut self, path: &Path) -> Result<bool, Error>;
    /// Mounts `path` as described by the fstab.
    fn mount(&mut self, path: &Path) -> Result<(), Error>;
    fn bind_mount(&mut self, source: &Path, target: &Path) -> Result<(), Error>;

    // Files
    fn path_exists(&mut self, path: &Path) -> Result<bool, Error>;
    fn create_dir_all(&mut self, path: &Path) -> Result<(), Error>;
    fn chown(&mut self, path: &Path, user: &str, group: &str) -> Result<(), Error>;
    fn read_file(&mut self, path: &Path) -> Result<Option<String>, Error>;
    fn write_file(&mut self, path: &Path, contents: &str) -> Result<(), Error>;
    /// Returns None when the host has no os-release file.
    fn os_release(&mut self) -> Result<Option<OsRelease>, Error>;

    // Packages
    fn download(&mut self, url: &str) -> Result<Vec<u8>, Error>;
    fn install_keyring(&mut self, armored: &[u8], keyring: &Path) -> Result<(), Error>;
    fn update_package_index(&mut self) -> Result<(), Error>;
    fn install_packages(&mut self, packages: &[String]) -> Result<(), Error>;
    fn fix_broken_packages(&mut self) -> Result<(), Error>;
    fn package_installed(&mut self, package: &str) -> Result<bool, Error>;

    // Database
    fn database_ready(&mut self) -> Result<bool, Error>;
    fn role_exists(&mut self, role: &str) -> Result<bool, Error>;
    fn create_role(&mut self, role: &str) -> Result<(), Error>;
    fn database_encoding(&mut self, database: &str) -> Result<Option<String>, Error>;
    fn database_collation(&mut self, database: &str) -> Result<Option<String>, Error>;
    fn create_database(&mut self, database: &str, owner: &str, locale: &str)
        -> Result<(), Error>;
    fn run_database_script(&mut self, script: &Path) -> Result<(), Error>;
    fn disconnect_sessions(&mut self, database: &str) -> Result<(), Error>;
    fn drop_database(&mut self, database: &str) -> Result<(), Error>;

    // Services
    fn service_enabled(&mut self, unit: &str) -> Result<bool, Error>;
    fn service_active(&mut self, unit: &str) -> Result<bool, Error>;
    fn enable_service(&mut self, unit: &str) -> Result<(), Error>;
    fn stop_service(&mut self, unit: &str) -> Result<(), Error>;

    fn sleep(&mut self, duration: Duration);
}

/// The machine Bulwark is running on.
#[derive(Debug, Default)]
pub struct LiveHost {
    /// Answer to the wipe prompt given up front, e.g. on the command line.
    pub wipe_confirmation: Option<String>,
}

impl LiveHost {
    pub fn new(wipe_confirmation: Option<String>) -> Self {
        Self { wipe_confirmation }
    }
}

fn as_paths(devices: &[PathBuf]) -> Vec<&Path> {
    devices.iter().map(PathBuf::as_path).collect()
}

impl Host for LiveHost {
    fn is_block_device(&mut self, path: &Path) -> Result<bool, Error> {
        block_devices::is_block_device(path)
    }

    fn confirm(&mut self, prompt: &str) -> Result<String, Error> {
        if let Some(answer) = &self.wipe_confirmation {
            return Ok(answer.clone());
        }

        Text::new(prompt)
            .prompt()
            .context("Failed to prompt for the wipe confirmation")
    }

    fn wipe_signatures(&mut self, device: &Path) -> Result<(), Error> {
        wipefs::all(device)
    }

    fn zap_partition_table(&mut self, device: &Path) -> Result<(), Error> {
        wipefs::zap_partition_table(device)
    }

    fn zfs_pool_exists(&mut self, pool: &str) -> Result<bool, Error> {
        zfs::pool_exists(pool)
    }

    fn zfs_create_pool(
        &mut self,
        pool: &str,
        vdev: Option<&str>,
        ashift: u8,
        devices: &[PathBuf],
    ) -> Result<(), Error> {
        zfs::create_pool(pool, vdev, ashift, &as_paths(devices))
    }

    fn zfs_dataset_exists(&mut self, dataset: &str) -> Result<bool, Error> {
        zfs::dataset_exists(dataset)
    }

    fn zfs_create_dataset(
        &mut self,
        dataset: &str,
        options: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        zfs::create_dataset(dataset, options)
    }

    fn zfs_mountpoint(&mut self, dataset: &str) -> Result<String, Error> {
        zfs::get_property(dataset, "mountpoint")
    }

    fn zfs_set_mountpoint(&mut self, dataset: &str, path: &Path) -> Result<(), Error> {
        zfs::set_property(dataset, "mountpoint", &path.to_string_lossy())
    }

    fn zfs_mount(&mut self, dataset: &str) -> Result<(), Error> {
        zfs::mount(dataset)
    }

    fn physical_volume_exists(&mut self, device: &Path) -> Result<bool, Error> {
        lvm::physical_volume_exists(device)
    }

    fn create_physical_volume(&mut self, device: &Path) -> Result<(), Error> {
        lvm::create_physical_volume(device)
    }

    fn volume_group_exists(&mut self, volume_group: &str) -> Result<bool, Error> {
        lvm::volume_group_exists(volume_group)
    }

    fn create_volume_group(
        &mut self,
        volume_group: &str,
        devices: &[PathBuf],
    ) -> Result<(), Error> {
        lvm::create_volume_group(volume_group, &as_paths(devices))
    }

    fn logical_volume_exists(
        &mut self,
        volume_group: &str,
        logical_volume: &str,
    ) -> Result<bool, Error> {
        lvm::logical_volume_exists(volume_group, logical_volume)
    }

    fn create_logical_volume(
        &mut self,
        volume_group: &str,
        logical_volume: &str,
        size: &LvmSize,
    ) -> Result<(), Error> {
        lvm::create_logical_volume(volume_group, logical_volume, size)
    }

    fn filesystem_type(&mut self, device: &Path) -> Result<Option<String>, Error> {
        blkid::get_filesystem_type(device)
    }

    fn filesystem_uuid(&mut self, device: &Path) -> Result<Uuid, Error> {
        blkid::get_filesystem_uuid(device)
    }

    fn format(&mut self, device: &Path, filesystem: &str) -> Result<(), Error> {
        mkfs::run(device, filesystem)
    }

    fn read_fstab(&mut self) -> Result<TabFile, Error> {
        TabFile::read(tabfile::FSTAB_PATH)
    }

    fn append_fstab(&mut self, entry: &TabFileEntry) -> Result<(), Error> {
        tabfile::append_entry(tabfile::FSTAB_PATH, entry)
    }

    fn is_mountpoint(&mut self, path: &Path) -> Result<bool, Error> {
        mountpoint::check_is_mountpoint(path)
    }

    fn mount(&mut self, path: &Path) -> Result<(), Error> {
        mount::mount_from_fstab(path)
    }

    fn bind_mount(&mut self, source: &Path, target: &Path) -> Result<(), Error> {
        mount::bind_mount(source, target)
    }

    fn path_exists(&mut self, path: &Path) -> Result<bool, Error> {
        path.try_exists()
            .with_context(|| format!("Failed to check whether '{}' exists", path.display()))
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<(), Error> {
        files::create_dirs(path)
    }

    fn chown(&mut self, path: &Path, user: &str, group: &str) -> Result<(), Error> {
        files::chown_by_name(path, user, group)
    }

    fn read_file(&mut self, path: &Path) -> Result<Option<String>, Error> {
        files::read_optional(path)
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> Result<(), Error> {
        files::write_file(path, contents.as_bytes())
    }

    fn os_release(&mut self) -> Result<Option<OsRelease>, Error> {
        match OsRelease::read() {
            Ok(os_release) => Ok(Some(os_release)),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn download(&mut self, url: &str) -> Result<Vec<u8>, Error> {
        http::get_bytes(url, Duration::from_secs(http::GET_TIMEOUT_SECS))
    }

    fn install_keyring(&mut self, armored: &[u8], keyring: &Path) -> Result<(), Error> {
        gpg::dearmor(armored, keyring)
    }

    fn update_package_index(&mut self) -> Result<(), Error> {
        apt::update()
    }

    fn install_packages(&mut self, packages: &[String]) -> Result<(), Error> {
        apt::install(packages)
    }

    fn fix_broken_packages(&mut self) -> Result<(), Error> {
        apt::fix_broken()
    }

    fn package_installed(&mut self, package: &str) -> Result<bool, Error> {
        apt::is_installed(package)
    }

    fn database_ready(&mut self) -> Result<bool, Error> {
        psql::is_ready()
    }

    fn role_exists(&mut self, role: &str) -> Result<bool, Error> {
        psql::role_exists(role)
    }

    fn create_role(&mut self, role: &str) -> Result<(), Error> {
        psql::create_role(role)
    }

    fn database_encoding(&mut self, database: &str) -> Result<Option<String>, Error> {
        psql::database_encoding(database)
    }

    fn database_collation(&mut self, database: &str) -> Result<Option<String>, Error> {
        psql::database_collation(database)
    }

    fn create_database(
        &mut self,
        database: &str,
        owner: &str,
        locale: &str,
    ) -> Result<(), Error> {
        psql::create_database(database, owner, locale)
    }

    fn run_database_script(&mut self, script: &Path) -> Result<(), Error> {
        psql::run_script(script)
    }

    fn disconnect_sessions(&mut self, database: &str) -> Result<(), Error> {
        psql::disconnect_sessions(database)
    }

    fn drop_database(&mut self, database: &str) -> Result<(), Error> {
        psql::drop_database(database)
    }

    fn service_enabled(&mut self, unit: &str) -> Result<bool, Error> {
        systemctl::is_enabled(unit)
    }

    fn service_active(&mut self, unit: &str) -> Result<bool, Error> {
        systemctl::is_active(unit)
    }

    fn enable_service(&mut self, unit: &str) -> Result<(), Error> {
        systemctl::enable_now(unit)
    }

    fn stop_service(&mut self, unit: &str) -> Result<(), Error> {
        systemctl::stop(unit)
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
