use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Error};
use log::{LevelFilter, Log, Metadata, Record};
use uuid::Uuid;

use osutils::files;

use super::LogEntry;

/// JSON-lines log of a single run. The file is truncated when the logger is
/// created, so it only ever holds the latest run.
pub struct BackgroundLog {
    writer: Mutex<BufWriter<File>>,
    run_id: Uuid,
    max_level: LevelFilter,
}

impl BackgroundLog {
    pub fn create(path: impl AsRef<Path>, run_id: Uuid) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            files::create_dirs(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create background log '{}'", path.display()))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            run_id,
            max_level: LevelFilter::Trace,
        })
    }

    pub fn with_max_level(self, max_level: LevelFilter) -> Self {
        Self { max_level, ..self }
    }

    pub fn into_logger(self) -> Box<dyn Log> {
        Box::new(self)
    }

    fn write_entry(&self, record: &Record) -> Result<(), Error> {
        let mut line = serde_json::to_string(&LogEntry::new(self.run_id, record))?;
        line.push('\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("Background log lock poisoned"))?;
        writer.write_all(line.as_bytes())?;
        // Flush per entry so the log survives an abort
        writer.flush()?;
        Ok(())
    }
}

impl Log for BackgroundLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        // Nowhere to report a failure to log
        let _ = self.write_entry(record);
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use log::Level;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_filter() {
        let test_dir = tempdir().unwrap();
        let logger = BackgroundLog::create(test_dir.path().join("bulwark.log"), Uuid::nil())
            .unwrap()
            .with_max_level(LevelFilter::Info)
            .into_logger();

        assert!(logger.enabled(&Metadata::builder().level(Level::Info).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Debug).build()));
    }

    #[test]
    fn test_create_failure() {
        let test_dir = tempdir().unwrap();
        // A directory cannot be opened as the log file
        assert!(BackgroundLog::create(test_dir.path(), Uuid::nil()).is_err());
    }

    #[test]
    fn test_creates_parent_and_truncates() {
        let test_dir = tempdir().unwrap();
        let target = test_dir.path().join("log/bulwark.log");
        files::write_file(&target, b"previous run\n").unwrap();

        let logger = BackgroundLog::create(&target, Uuid::nil())
            .unwrap()
            .into_logger();
        logger.log(
            &Record::builder()
                .args(format_args!("new run"))
                .level(Level::Info)
                .build(),
        );

        let content = fs::read_to_string(&target).unwrap();
        assert!(!content.contains("previous run"));
        assert!(content.contains("new run"));
    }

    #[test]
    fn test_background_log() {
        let test_dir = tempdir().unwrap();
        let target = test_dir.path().join("bulwark.log");
        let run_id = Uuid::new_v4();
        let logger = BackgroundLog::create(&target, run_id).unwrap().into_logger();

        for message in ["Creating ZFS pool 'backup'", "Catalog 'bacula' is UTF8"] {
            logger.log(
                &Record::builder()
                    .args(format_args!("{message}"))
                    .level(Level::Info)
                    .target("bulwark")
                    .build(),
            );
        }
        logger.flush();

        let content = fs::read_to_string(target).unwrap();
        let entries: Vec<LogEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.run_id == run_id));
        assert_eq!(entries[1].message, "Catalog 'bacula' is UTF8");
        assert_eq!(entries[0].level, Level::Info);
    }
}
