use std::{
    collections::{BTreeMap, HashSet},
    fmt::{Display, Formatter},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        LVM_FILESYSTEM_DEFAULT, LVM_FREE_SUFFIX, LVM_LOGICAL_VOLUME_DEFAULT, LVM_SIZE_DEFAULT,
        LVM_VOLUME_GROUP_DEFAULT, POOL_MOUNT_PATH_DEFAULT, ZFS_ASHIFT_DEFAULT,
        ZFS_DATASET_NAME_DEFAULT, ZFS_POOL_NAME_DEFAULT,
    },
    is_default,
};

use super::{check_absolute, check_name, error::ConfigValidationError};

/// Describes the storage pool backing the backup archive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Storage {
    /// Whether to validate disks and build the pool. When false, `mountPath`
    /// is assumed to already hold the backup storage.
    pub provision: bool,

    /// Pool manager to build the pool with.
    pub backend: PoolBackendKind,

    /// Ordered list of member block devices.
    pub devices: Vec<PathBuf>,

    /// Erase partition tables and filesystem signatures on every device before
    /// building the pool. Requires interactive confirmation.
    #[serde(skip_serializing_if = "is_default")]
    pub wipe_disks: bool,

    /// Where the pool's filesystem is mounted.
    pub mount_path: PathBuf,

    /// ZFS-specific settings, used when `backend` is `zfs`.
    pub zfs: ZfsSettings,

    /// LVM-specific settings, used when `backend` is `lvm`.
    pub lvm: LvmSettings,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            provision: true,
            backend: PoolBackendKind::default(),
            devices: Vec::new(),
            wipe_disks: false,
            mount_path: POOL_MOUNT_PATH_DEFAULT.into(),
            zfs: ZfsSettings::default(),
            lvm: LvmSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PoolBackendKind {
    #[default]
    Zfs,
    Lvm,
}

impl Display for PoolBackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolBackendKind::Zfs => f.write_str("zfs"),
            PoolBackendKind::Lvm => f.write_str("lvm"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ZfsSettings {
    /// Pool name.
    pub pool: String,

    /// Dataset name, relative to the pool.
    pub dataset: String,

    /// Redundancy layout of the single top-level vdev.
    pub layout: ZfsLayout,

    /// Sector alignment exponent passed as `ashift`.
    pub ashift: u8,

    /// Properties set on the dataset at creation time.
    pub options: BTreeMap<String, String>,
}

impl Default for ZfsSettings {
    fn default() -> Self {
        Self {
            pool: ZFS_POOL_NAME_DEFAULT.into(),
            dataset: ZFS_DATASET_NAME_DEFAULT.into(),
            layout: ZfsLayout::default(),
            ashift: ZFS_ASHIFT_DEFAULT,
            options: [
                ("compression", "lz4"),
                ("atime", "off"),
                ("recordsize", "1M"),
                ("xattr", "sa"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        }
    }
}

impl ZfsSettings {
    /// Full dataset name, `<pool>/<dataset>`.
    pub fn dataset_name(&self) -> String {
        format!("{}/{}", self.pool, self.dataset)
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ZfsLayout {
    Stripe,
    Mirror,
    Raidz1,
    #[default]
    Raidz2,
    Raidz3,
}

impl ZfsLayout {
    /// The vdev keyword for `zpool create`, if any. Stripes have none.
    pub fn vdev_keyword(&self) -> Option<&'static str> {
        match self {
            ZfsLayout::Stripe => None,
            ZfsLayout::Mirror => Some("mirror"),
            ZfsLayout::Raidz1 => Some("raidz1"),
            ZfsLayout::Raidz2 => Some("raidz2"),
            ZfsLayout::Raidz3 => Some("raidz3"),
        }
    }

    /// Fewest devices the layout can be built from.
    pub fn minimum_devices(&self) -> usize {
        match self {
            ZfsLayout::Stripe => 1,
            ZfsLayout::Mirror | ZfsLayout::Raidz1 => 2,
            ZfsLayout::Raidz2 => 3,
            ZfsLayout::Raidz3 => 4,
        }
    }
}

impl Display for ZfsLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.vdev_keyword().unwrap_or("stripe"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LvmSettings {
    pub volume_group: String,

    pub logical_volume: String,

    /// Either a percentage of the free extents (`100%FREE`) or an explicit
    /// size understood by `lvcreate -L` (`500G`).
    pub size: String,

    /// Filesystem created on the logical volume.
    pub filesystem: String,
}

impl Default for LvmSettings {
    fn default() -> Self {
        Self {
            volume_group: LVM_VOLUME_GROUP_DEFAULT.into(),
            logical_volume: LVM_LOGICAL_VOLUME_DEFAULT.into(),
            size: LVM_SIZE_DEFAULT.into(),
            filesystem: LVM_FILESYSTEM_DEFAULT.into(),
        }
    }
}

/// How the logical volume size is expressed to `lvcreate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LvmSize {
    /// `-l <N>%FREE`
    PercentFree(u8),
    /// `-L <size>`
    Absolute(String),
}

impl LvmSettings {
    /// Device node of the logical volume.
    pub fn device_path(&self) -> PathBuf {
        PathBuf::from("/dev")
            .join(&self.volume_group)
            .join(&self.logical_volume)
    }

    /// Parses the configured size.
    pub fn parsed_size(&self) -> Option<LvmSize> {
        let size = self.size.trim();
        if let Some(percent) = size.strip_suffix(LVM_FREE_SUFFIX) {
            return match percent.parse::<u8>() {
                Ok(p) if (1..=100).contains(&p) => Some(LvmSize::PercentFree(p)),
                _ => None,
            };
        }

        let digits = size.trim_end_matches(|c: char| "KMGTPkmgtp".contains(c));
        if digits.is_empty()
            || digits.len() + 1 < size.len()
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some(LvmSize::Absolute(size.to_string()))
    }
}

impl Storage {
    pub(crate) fn validate(&self) -> Result<(), ConfigValidationError> {
        check_absolute("storage.mountPath", &self.mount_path)?;

        if !self.provision {
            return Ok(());
        }

        if self.devices.is_empty() {
            return Err(ConfigValidationError::NoDevices);
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            check_absolute("storage.devices", device)?;
            if !seen.insert(device) {
                return Err(ConfigValidationError::DuplicateDevice {
                    device: device.display().to_string(),
                });
            }
        }

        match self.backend {
            PoolBackendKind::Zfs => {
                check_name("storage.zfs.pool", &self.zfs.pool)?;
                check_name("storage.zfs.dataset", &self.zfs.dataset)?;
                if self.devices.len() < self.zfs.layout.minimum_devices() {
                    return Err(ConfigValidationError::NotEnoughDevices {
                        layout: self.zfs.layout.to_string(),
                        minimum: self.zfs.layout.minimum_devices(),
                        count: self.devices.len(),
                    });
                }
            }
            PoolBackendKind::Lvm => {
                check_name("storage.lvm.volumeGroup", &self.lvm.volume_group)?;
                check_name("storage.lvm.logicalVolume", &self.lvm.logical_volume)?;
                check_name("storage.lvm.filesystem", &self.lvm.filesystem)?;
                if self.lvm.parsed_size().is_none() {
                    return Err(ConfigValidationError::InvalidVolumeSize {
                        size: self.lvm.size.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
