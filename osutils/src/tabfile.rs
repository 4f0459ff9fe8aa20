use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use uuid::Uuid;

/// Absolute path to the system fstab.
pub const FSTAB_PATH: &str = "/etc/fstab";

/// Filesystem type column used for bind mounts.
pub const BIND_FS_TYPE: &str = "none";

/// Mount option marking a bind mount.
pub const BIND_OPTION: &str = "bind";

/// A parsed fstab file. Comments and malformed lines are dropped.
#[derive(Debug, Default)]
pub struct TabFile {
    pub entries: Vec<TabFileEntry>,
}

/// A representation of a single entry in a tab file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabFileEntry {
    pub device: TabDevice,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub options: Vec<String>,
    pub dump: u8,
    pub fsck_pass: u8,
}

/// A representation of a device in a tab file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabDevice {
    Uuid(String),
    Label(String),
    Path(PathBuf),
    Other(String),
}

impl TabFile {
    /// Reads and parses the tab file at `path`. A missing file is an empty table.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, Error> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.as_ref().display())),
        }
    }

    /// Parses the contents of a tab file.
    pub fn parse(contents: &str) -> Self {
        Self {
            entries: contents.lines().filter_map(TabFileEntry::parse).collect(),
        }
    }

    /// Whether any entry is mounted from `device`.
    pub fn has_device(&self, device: &TabDevice) -> bool {
        self.entries.iter().any(|entry| &entry.device == device)
    }

    /// Whether an entry bind-mounts `source` onto `target`.
    pub fn has_bind(&self, source: impl AsRef<Path>, target: impl AsRef<Path>) -> bool {
        self.entries.iter().any(|entry| {
            entry.is_bind()
                && entry.device == TabDevice::Path(source.as_ref().to_path_buf())
                && entry.mount_point == target.as_ref()
        })
    }
}

impl TabFileEntry {
    /// Create an entry for the filesystem with the given UUID.
    pub fn new_uuid(uuid: &Uuid, mount_point: impl Into<PathBuf>, fs_type: &str) -> Self {
        Self {
            device: TabDevice::Uuid(uuid.to_string()),
            mount_point: mount_point.into(),
            fs_type: fs_type.into(),
            options: Vec::new(),
            dump: 0,
            fsck_pass: 2,
        }
    }

    /// Create a bind mount entry exposing `source` at `target`.
    pub fn new_bind(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            device: TabDevice::Path(source.into()),
            mount_point: target.into(),
            fs_type: BIND_FS_TYPE.into(),
            options: vec![BIND_OPTION.into()],
            dump: 0,
            fsck_pass: 0,
        }
    }

    /// Add options to this entry.
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Whether this entry is a bind mount.
    pub fn is_bind(&self) -> bool {
        self.fs_type == BIND_FS_TYPE
            && self
                .options
                .iter()
                .any(|o| o == BIND_OPTION || o == "rbind")
    }

    /// Parses one fstab line. Returns None for comments, blank lines and
    /// lines with fewer than three fields.
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut fields = line.split_whitespace();
        let device = TabDevice::parse(fields.next()?);
        let mount_point = PathBuf::from(unescape(fields.next()?));
        let fs_type = fields.next()?.to_string();
        let options = fields
            .next()
            .map(|o| o.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        let dump = fields.next().and_then(|d| d.parse().ok()).unwrap_or(0);
        let fsck_pass = fields.next().and_then(|p| p.parse().ok()).unwrap_or(0);

        Some(Self {
            device,
            mount_point,
            fs_type,
            options,
            dump,
            fsck_pass,
        })
    }

    /// Render this entry as a string suitable for writing to a tab file.
    pub fn render(&self) -> String {
        // If the options are empty, use "defaults" as the default
        let options = if self.options.is_empty() {
            "defaults".into()
        } else {
            self.options.join(",")
        };

        format!(
            "{} {} {} {} {} {}\n",
            self.device.render(),
            escape(&self.mount_point.to_string_lossy()),
            self.fs_type,
            options,
            self.dump,
            self.fsck_pass,
        )
    }
}

impl TabDevice {
    fn parse(field: &str) -> Self {
        if let Some(uuid) = field.strip_prefix("UUID=") {
            TabDevice::Uuid(uuid.to_lowercase())
        } else if let Some(label) = field.strip_prefix("LABEL=") {
            TabDevice::Label(unescape(label))
        } else if field.starts_with('/') {
            TabDevice::Path(PathBuf::from(unescape(field)))
        } else {
            TabDevice::Other(field.to_string())
        }
    }

    /// Render this device as a string.
    pub fn render(&self) -> String {
        match self {
            TabDevice::Uuid(uuid) => format!("UUID={uuid}"),
            TabDevice::Label(label) => format!("LABEL={}", escape(label)),
            TabDevice::Path(path) => escape(&path.to_string_lossy()),
            TabDevice::Other(other) => other.clone(),
        }
    }
}

/// fstab encodes spaces in paths as `\040` and tabs as `\011`.
fn escape(field: &str) -> String {
    field.replace(' ', "\\040").replace('\t', "\\011")
}

fn unescape(field: &str) -> String {
    field.replace("\\040", " ").replace("\\011", "\t")
}

/// Appends `entry` to the tab file at `path`, creating the file if needed and
/// making sure the previous last line is terminated.
pub fn append_entry(path: impl AsRef<Path>, entry: &TabFileEntry) -> Result<(), Error> {
    let path = path.as_ref();
    let needs_newline = match std::fs::read(path) {
        Ok(contents) => !contents.is_empty() && !contents.ends_with(b"\n"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for appending", path.display()))?;

    if needs_newline {
        file.write_all(b"\n")
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    file.write_all(entry.render().as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))
}
