//! In-memory host used by the pipeline tests.
//!
//! Probes answer from the simulated state; mutations update it and are
//! appended to [`FakeHost::calls`] so tests can assert on exactly what would
//! have been run.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Error};
use uuid::Uuid;

use bulwark_api::config::LvmSize;
use osutils::{
    osrelease::OsRelease,
    tabfile::{TabFile, TabFileEntry},
};

use super::Host;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FakeDatabase {
    pub encoding: String,
    pub collation: String,
}

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    /// Mutating calls, in order.
    pub calls: Vec<String>,
    /// Operations that fail, keyed by method name or `method:argument`.
    pub failing: HashSet<String>,

    pub block_devices: HashSet<PathBuf>,
    pub confirmation: String,

    pub pools: HashSet<String>,
    pub datasets: HashMap<String, String>,
    pub physical_volumes: HashSet<PathBuf>,
    pub volume_groups: HashSet<String>,
    pub logical_volumes: HashSet<String>,
    pub filesystems: HashMap<PathBuf, (String, Uuid)>,
    pub fstab: Vec<TabFileEntry>,
    pub mounted: HashSet<PathBuf>,

    pub dirs: HashSet<PathBuf>,
    pub files: HashMap<PathBuf, String>,
    pub os_release: Option<OsRelease>,

    /// Bodies served by `download`. Unknown URLs answer with a 404.
    pub downloads: HashMap<String, Vec<u8>>,
    pub installed_packages: HashSet<String>,
    /// Number of `install_packages` calls that fail before one succeeds.
    pub install_failures: u32,

    /// Number of readiness probes that fail before the server answers.
    pub database_unready_probes: u32,
    pub database_never_ready: bool,
    pub roles: HashSet<String>,
    pub databases: HashMap<String, FakeDatabase>,
    /// Collation new databases end up with, whatever was requested.
    pub forced_collation: Option<String>,

    pub enabled_services: HashSet<String>,
    pub active_services: HashSet<String>,
    /// Services that ignore `stop`.
    pub stubborn_services: HashSet<String>,

    pub slept: Duration,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with the given whole-disk block devices.
    pub fn with_block_devices(devices: &[&str]) -> Self {
        Self {
            block_devices: devices.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    pub fn fail(&mut self, operation: impl Into<String>) {
        self.failing.insert(operation.into());
    }

    fn check(&self, operation: &str, argument: impl std::fmt::Display) -> Result<(), Error> {
        let keyed = format!("{operation}:{argument}");
        if self.failing.contains(operation) || self.failing.contains(&keyed) {
            bail!("Simulated failure of {keyed}");
        }
        Ok(())
    }

    fn record(&mut self, call: impl Into<String>) {
        self.calls.push(call.into());
    }

    /// Recorded calls starting with `prefix`.
    pub fn calls_to(&self, prefix: &str) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    /// Position of the first recorded call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.iter().position(|c| c.starts_with(prefix))
    }

    pub fn start_service(&mut self, unit: &str) {
        self.enabled_services.insert(unit.into());
        self.active_services.insert(unit.into());
    }
}

impl Host for FakeHost {
    fn is_block_device(&mut self, path: &Path) -> Result<bool, Error> {
        self.check("is_block_device", path.display())?;
        Ok(self.block_devices.contains(path))
    }

    fn confirm(&mut self, prompt: &str) -> Result<String, Error> {
        self.check("confirm", prompt)?;
        Ok(self.confirmation.clone())
    }

    fn wipe_signatures(&mut self, device: &Path) -> Result<(), Error> {
        self.record(format!("wipefs {}", device.display()));
        self.check("wipe_signatures", device.display())
    }

    fn zap_partition_table(&mut self, device: &Path) -> Result<(), Error> {
        self.record(format!("sgdisk {}", device.display()));
        self.check("zap_partition_table", device.display())
    }

    fn zfs_pool_exists(&mut self, pool: &str) -> Result<bool, Error> {
        Ok(self.pools.contains(pool))
    }

    fn zfs_create_pool(
        &mut self,
        pool: &str,
        vdev: Option<&str>,
        ashift: u8,
        devices: &[PathBuf],
    ) -> Result<(), Error> {
        let devices: Vec<String> = devices.iter().map(|d| d.display().to_string()).collect();
        self.record(format!(
            "zpool create {pool} {} ashift={ashift} {}",
            vdev.unwrap_or("stripe"),
            devices.join(" ")
        ));
        self.check("zfs_create_pool", pool)?;
        self.pools.insert(pool.into());
        Ok(())
    }

    fn zfs_dataset_exists(&mut self, dataset: &str) -> Result<bool, Error> {
        Ok(self.datasets.contains_key(dataset))
    }

    fn zfs_create_dataset(
        &mut self,
        dataset: &str,
        options: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let options: Vec<String> = options.iter().map(|(k, v)| format!("{k}={v}")).collect();
        self.record(format!("zfs create {dataset} {}", options.join(",")));
        self.check("zfs_create_dataset", dataset)?;
        self.datasets.insert(dataset.into(), "none".into());
        Ok(())
    }

    fn zfs_mountpoint(&mut self, dataset: &str) -> Result<String, Error> {
        match self.datasets.get(dataset) {
            Some(mountpoint) => Ok(mountpoint.clone()),
            None => bail!("dataset does not exist"),
        }
    }

    fn zfs_set_mountpoint(&mut self, dataset: &str, path: &Path) -> Result<(), Error> {
        self.record(format!("zfs set mountpoint={} {dataset}", path.display()));
        self.check("zfs_set_mountpoint", dataset)?;
        self.datasets
            .insert(dataset.into(), path.display().to_string());
        Ok(())
    }

    fn zfs_mount(&mut self, dataset: &str) -> Result<(), Error> {
        self.record(format!("zfs mount {dataset}"));
        self.check("zfs_mount", dataset)?;
        if let Some(mountpoint) = self.datasets.get(dataset) {
            self.mounted.insert(mountpoint.into());
        }
        Ok(())
    }

    fn physical_volume_exists(&mut self, device: &Path) -> Result<bool, Error> {
        Ok(self.physical_volumes.contains(device))
    }

    fn create_physical_volume(&mut self, device: &Path) -> Result<(), Error> {
        self.record(format!("pvcreate {}", device.display()));
        self.check("create_physical_volume", device.display())?;
        self.physical_volumes.insert(device.into());
        Ok(())
    }

    fn volume_group_exists(&mut self, volume_group: &str) -> Result<bool, Error> {
        Ok(self.volume_groups.contains(volume_group))
    }

    fn create_volume_group(
        &mut self,
        volume_group: &str,
        devices: &[PathBuf],
    ) -> Result<(), Error> {
        let devices: Vec<String> = devices.iter().map(|d| d.display().to_string()).collect();
        self.record(format!("vgcreate {volume_group} {}", devices.join(" ")));
        self.check("create_volume_group", volume_group)?;
        self.volume_groups.insert(volume_group.into());
        Ok(())
    }

    fn logical_volume_exists(
        &mut self,
        volume_group: &str,
        logical_volume: &str,
    ) -> Result<bool, Error> {
        Ok(self
            .logical_volumes
            .contains(&format!("{volume_group}/{logical_volume}")))
    }

    fn create_logical_volume(
        &mut self,
        volume_group: &str,
        logical_volume: &str,
        size: &LvmSize,
    ) -> Result<(), Error> {
        self.record(format!("lvcreate {volume_group}/{logical_volume} {size:?}"));
        self.check("create_logical_volume", logical_volume)?;
        self.logical_volumes
            .insert(format!("{volume_group}/{logical_volume}"));
        Ok(())
    }

    fn filesystem_type(&mut self, device: &Path) -> Result<Option<String>, Error> {
        self.check("filesystem_type", device.display())?;
        Ok(self.filesystems.get(device).map(|(fs, _)| fs.clone()))
    }

    fn filesystem_uuid(&mut self, device: &Path) -> Result<Uuid, Error> {
        match self.filesystems.get(device) {
            Some((_, uuid)) => Ok(*uuid),
            None => bail!("No filesystem on '{}'", device.display()),
        }
    }

    fn format(&mut self, device: &Path, filesystem: &str) -> Result<(), Error> {
        self.record(format!("mkfs {} {filesystem}", device.display()));
        self.check("format", device.display())?;
        self.filesystems
            .insert(device.into(), (filesystem.into(), Uuid::new_v4()));
        Ok(())
    }

    fn read_fstab(&mut self) -> Result<TabFile, Error> {
        self.check("read_fstab", "")?;
        Ok(TabFile {
            entries: self.fstab.clone(),
        })
    }

    fn append_fstab(&mut self, entry: &TabFileEntry) -> Result<(), Error> {
        self.record(format!("fstab {}", entry.render().trim_end()));
        self.check("append_fstab", entry.mount_point.display())?;
        self.fstab.push(entry.clone());
        Ok(())
    }

    fn is_mountpoint(&mut self, path: &Path) -> Result<bool, Error> {
        Ok(self.mounted.contains(path))
    }

    fn mount(&mut self, path: &Path) -> Result<(), Error> {
        self.record(format!("mount {}", path.display()));
        self.check("mount", path.display())?;
        self.mounted.insert(path.into());
        Ok(())
    }

    fn bind_mount(&mut self, source: &Path, target: &Path) -> Result<(), Error> {
        self.record(format!(
            "mount --bind {} {}",
            source.display(),
            target.display()
        ));
        self.check("bind_mount", target.display())?;
        self.mounted.insert(target.into());
        Ok(())
    }

    fn path_exists(&mut self, path: &Path) -> Result<bool, Error> {
        Ok(self.dirs.contains(path) || self.files.contains_key(path))
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<(), Error> {
        self.record(format!("mkdir {}", path.display()));
        self.check("create_dir_all", path.display())?;
        self.dirs.insert(path.into());
        Ok(())
    }

    fn chown(&mut self, path: &Path, user: &str, group: &str) -> Result<(), Error> {
        self.record(format!("chown {user}:{group} {}", path.display()));
        self.check("chown", path.display())
    }

    fn read_file(&mut self, path: &Path) -> Result<Option<String>, Error> {
        Ok(self.files.get(path).cloned())
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> Result<(), Error> {
        self.record(format!("write {}", path.display()));
        self.check("write_file", path.display())?;
        self.files.insert(path.into(), contents.into());
        Ok(())
    }

    fn os_release(&mut self) -> Result<Option<OsRelease>, Error> {
        self.check("os_release", "")?;
        Ok(self.os_release.clone())
    }

    fn download(&mut self, url: &str) -> Result<Vec<u8>, Error> {
        self.record(format!("download {url}"));
        match self.downloads.get(url) {
            Some(body) => Ok(body.clone()),
            None => bail!("Failed to GET {url} with status 404 Not Found"),
        }
    }

    fn install_keyring(&mut self, armored: &[u8], keyring: &Path) -> Result<(), Error> {
        self.record(format!("gpg --dearmor {}", keyring.display()));
        self.check("install_keyring", keyring.display())?;
        self.files
            .insert(keyring.into(), String::from_utf8_lossy(armored).into());
        Ok(())
    }

    fn update_package_index(&mut self) -> Result<(), Error> {
        self.record("apt-get update");
        self.check("update_package_index", "")
    }

    fn install_packages(&mut self, packages: &[String]) -> Result<(), Error> {
        self.record(format!("apt-get install {}", packages.join(" ")));
        if self.install_failures > 0 {
            self.install_failures -= 1;
            bail!("Simulated package installation failure");
        }
        self.installed_packages.extend(packages.iter().cloned());
        Ok(())
    }

    fn fix_broken_packages(&mut self) -> Result<(), Error> {
        self.record("apt-get install -f");
        self.check("fix_broken_packages", "")
    }

    fn package_installed(&mut self, package: &str) -> Result<bool, Error> {
        Ok(self.installed_packages.contains(package))
    }

    fn database_ready(&mut self) -> Result<bool, Error> {
        if self.database_never_ready {
            return Ok(false);
        }
        if self.database_unready_probes > 0 {
            self.database_unready_probes -= 1;
            bail!("no response");
        }
        Ok(true)
    }

    fn role_exists(&mut self, role: &str) -> Result<bool, Error> {
        Ok(self.roles.contains(role))
    }

    fn create_role(&mut self, role: &str) -> Result<(), Error> {
        self.record(format!("CREATE ROLE {role}"));
        self.check("create_role", role)?;
        self.roles.insert(role.into());
        Ok(())
    }

    fn database_encoding(&mut self, database: &str) -> Result<Option<String>, Error> {
        self.check("database_encoding", database)?;
        Ok(self.databases.get(database).map(|db| db.encoding.clone()))
    }

    fn database_collation(&mut self, database: &str) -> Result<Option<String>, Error> {
        Ok(self.databases.get(database).map(|db| db.collation.clone()))
    }

    fn create_database(
        &mut self,
        database: &str,
        owner: &str,
        locale: &str,
    ) -> Result<(), Error> {
        self.record(format!("CREATE DATABASE {database} OWNER {owner} {locale}"));
        self.check("create_database", database)?;
        self.databases.insert(
            database.into(),
            FakeDatabase {
                encoding: "UTF8".into(),
                collation: self
                    .forced_collation
                    .clone()
                    .unwrap_or_else(|| locale.into()),
            },
        );
        Ok(())
    }

    fn run_database_script(&mut self, script: &Path) -> Result<(), Error> {
        self.record(format!("script {}", script.display()));
        self.check("run_database_script", script.display())
    }

    fn disconnect_sessions(&mut self, database: &str) -> Result<(), Error> {
        self.record(format!("disconnect {database}"));
        self.check("disconnect_sessions", database)
    }

    fn drop_database(&mut self, database: &str) -> Result<(), Error> {
        self.record(format!("DROP DATABASE {database}"));
        self.check("drop_database", database)?;
        self.databases.remove(database);
        Ok(())
    }

    fn service_enabled(&mut self, unit: &str) -> Result<bool, Error> {
        Ok(self.enabled_services.contains(unit))
    }

    fn service_active(&mut self, unit: &str) -> Result<bool, Error> {
        Ok(self.active_services.contains(unit))
    }

    fn enable_service(&mut self, unit: &str) -> Result<(), Error> {
        self.record(format!("systemctl enable --now {unit}"));
        self.check("enable_service", unit)?;
        self.start_service(unit);
        Ok(())
    }

    fn stop_service(&mut self, unit: &str) -> Result<(), Error> {
        self.record(format!("systemctl stop {unit}"));
        self.check("stop_service", unit)?;
        if !self.stubborn_services.contains(unit) {
            self.active_services.remove(unit);
        }
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
    }
}
