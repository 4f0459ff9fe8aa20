use chrono::{DateTime, Utc};
use log::Level;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(super) mod background_log;
pub(super) mod multilog;

/// One line of the background log.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Identifies the run the entry belongs to.
    pub run_id: Uuid,
    #[serde(with = "level_name")]
    pub level: Level,
    pub message: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LogEntry {
    fn new(run_id: Uuid, record: &log::Record) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            level: record.level(),
            message: record.args().to_string(),
            target: record.target().to_string(),
            location: record
                .file()
                .map(|file| format!("{file}:{}", record.line().unwrap_or_default())),
        }
    }
}

/// Serializes log levels as lowercase names.
mod level_name {
    use std::str::FromStr;

    use log::Level;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        Level::from_str(&name).map_err(D::Error::custom)
    }
}
