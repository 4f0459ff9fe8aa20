use const_format::formatcp;

// Configuration constants

/// Path to load the provisioning configuration from when none is given.
pub const BULWARK_CONFIG_PATH_DEFAULT: &str = "/etc/bulwark/config.yaml";

/// Directory holding Bulwark's own logs.
pub const BULWARK_LOG_DIRECTORY: &str = "/var/log/bulwark";

/// JSON-lines log of the current run, truncated at the start of every run.
pub const BULWARK_BACKGROUND_LOG_PATH: &str = formatcp!("{BULWARK_LOG_DIRECTORY}/bulwark.log");

/// Literal the operator must type to allow the configured disks to be erased.
pub const WIPE_CONFIRMATION_TOKEN: &str = "WIPE";

// Storage defaults

/// Default mount path of the backup pool.
pub const POOL_MOUNT_PATH_DEFAULT: &str = "/srv/backup";

/// Default ZFS pool name.
pub const ZFS_POOL_NAME_DEFAULT: &str = "backup";

/// Default ZFS dataset name, relative to the pool.
pub const ZFS_DATASET_NAME_DEFAULT: &str = "bacula";

/// Default ZFS pool sector alignment.
pub const ZFS_ASHIFT_DEFAULT: u8 = 12;

/// Default LVM volume group name.
pub const LVM_VOLUME_GROUP_DEFAULT: &str = "vg_backup";

/// Default LVM logical volume name.
pub const LVM_LOGICAL_VOLUME_DEFAULT: &str = "lv_backup";

/// Default LVM logical volume size: all remaining free space.
pub const LVM_SIZE_DEFAULT: &str = "100%FREE";

/// Suffix marking an LVM size as a percentage of free extents.
pub const LVM_FREE_SUFFIX: &str = "%FREE";

/// Default filesystem for the LVM logical volume.
pub const LVM_FILESYSTEM_DEFAULT: &str = "xfs";

/// Mount options used for the pool's persistent mount entry.
pub const POOL_MOUNT_OPTIONS: &str = "defaults,nofail";

// Bind mount defaults

/// Path where the backup software expects its archive storage.
pub const BIND_TARGET_PATH_DEFAULT: &str = "/opt/bacula/archive";

/// Runtime identity of the backup storage daemon.
pub const BACKUP_USER_DEFAULT: &str = "bacula";

/// Runtime group of the backup storage daemon.
pub const BACKUP_GROUP_DEFAULT: &str = "bacula";

// Package source defaults

/// Placeholder substituted with the release series in repository URLs.
pub const SERIES_PLACEHOLDER: &str = "{series}";

/// Series used when the host OS version is not in the lookup table.
pub const SERIES_FALLBACK: &str = "bookworm";

/// Default URL of the repository signing key.
pub const PACKAGE_KEY_URL_DEFAULT: &str =
    "https://www.bacula.org/downloads/Bacula-4096-Distribution-Verification-key.asc";

/// Default repository URL.
pub const PACKAGE_REPO_URL_DEFAULT: &str = "https://www.bacula.org/packages/community/debs/15.0.2";

/// Default path of the dearmored signing key.
pub const KEYRING_PATH_DEFAULT: &str = "/etc/apt/keyrings/bacula.gpg";

/// Default path of the repository definition.
pub const SOURCE_LIST_PATH_DEFAULT: &str = "/etc/apt/sources.list.d/bacula.list";

/// Repository component.
pub const PACKAGE_COMPONENT: &str = "main";

/// Packages installed by default.
pub const PACKAGES_DEFAULT: &[&str] = &[
    "bacula-postgresql",
    "bacula-console",
    "baculum-api",
    "baculum-web",
];

// Catalog defaults

/// Default catalog database name.
pub const CATALOG_NAME_DEFAULT: &str = "bacula";

/// Default catalog owner role.
pub const CATALOG_OWNER_DEFAULT: &str = "bacula";

/// Default catalog locale, used for both collation and character type.
pub const CATALOG_LOCALE_DEFAULT: &str = "C.UTF-8";

/// The only acceptable catalog encoding, as reported by PostgreSQL.
pub const CATALOG_ENCODING: &str = "UTF8";

/// Database administrator account used to run catalog SQL.
pub const DATABASE_SUPERUSER: &str = "postgres";

/// Default unit name of the database server.
pub const DATABASE_SERVICE_DEFAULT: &str = "postgresql";

/// Default schema scripts run after creating the catalog.
pub const CATALOG_SCHEMA_SCRIPTS_DEFAULT: &[&str] = &[
    "/opt/bacula/scripts/make_postgresql_tables",
    "/opt/bacula/scripts/grant_postgresql_privileges",
];

/// Default number of readiness probes against the database server.
pub const DATABASE_READY_ATTEMPTS_DEFAULT: u32 = 10;

/// Default pause between readiness probes.
pub const DATABASE_READY_INTERVAL_SECS_DEFAULT: u64 = 3;

// Service defaults

/// Director unit; it holds catalog connections and must be stopped for repair.
pub const DIRECTOR_SERVICE: &str = "bacula-dir";

/// Core units the backup system cannot run without.
pub const CORE_SERVICES_DEFAULT: &[&str] = &[DIRECTOR_SERVICE, "bacula-sd", "bacula-fd"];

/// Auxiliary units hosting the web console.
pub const AUXILIARY_SERVICES_DEFAULT: &[&str] = &["apache2"];
