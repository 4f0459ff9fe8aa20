use std::collections::BTreeMap;

use log::{LevelFilter, Log, Metadata, Record};

/// Fans every record out to a set of loggers, after applying per-target
/// level overrides that hold for all of them.
pub struct MultiLogger {
    loggers: Vec<Box<dyn Log>>,
    target_filters: BTreeMap<String, LevelFilter>,
}

impl Default for MultiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
            target_filters: BTreeMap::new(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn Log>) -> Self {
        self.loggers.push(logger);
        self
    }

    /// Caps the level of records whose target starts with `prefix`.
    pub fn with_target_filter(mut self, prefix: &str, level: LevelFilter) -> Self {
        self.target_filters.insert(prefix.into(), level);
        self
    }

    pub fn add_logger(&mut self, logger: Box<dyn Log>) {
        self.loggers.push(logger);
    }

    pub fn init(self) -> Result<(), log::SetLoggerError> {
        log::set_max_level(LevelFilter::Trace);
        log::set_boxed_logger(Box::new(self))
    }

    /// The longest matching prefix decides.
    fn passes_target_filter(&self, metadata: &Metadata) -> bool {
        self.target_filters
            .iter()
            .filter(|(prefix, _)| metadata.target().starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(true, |(_, level)| metadata.level() <= *level)
    }
}

impl Log for MultiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.passes_target_filter(metadata) && self.loggers.iter().any(|l| l.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        if !self.passes_target_filter(record.metadata()) {
            return;
        }

        self.loggers
            .iter()
            .filter(|l| l.enabled(record.metadata()))
            .for_each(|l| l.log(record));
    }

    fn flush(&self) {
        self.loggers.iter().for_each(|l| l.flush());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use log::Level;

    #[derive(Default)]
    struct CountingLogger {
        enabled: bool,
        received: Arc<AtomicUsize>,
    }

    impl Log for CountingLogger {
        fn enabled(&self, _: &Metadata) -> bool {
            self.enabled
        }

        fn log(&self, _: &Record) {
            self.received.fetch_add(1, Ordering::Relaxed);
        }

        fn flush(&self) {}
    }

    fn record(target: &str, level: Level) -> Record<'_> {
        Record::builder().target(target).level(level).build()
    }

    #[test]
    fn test_enabled() {
        let multi_logger = MultiLogger::new()
            .with_logger(Box::<CountingLogger>::default())
            .with_logger(Box::<CountingLogger>::default());
        assert!(!multi_logger.enabled(&Metadata::builder().level(Level::Error).build()));

        let multi_logger = MultiLogger::new()
            .with_logger(Box::<CountingLogger>::default())
            .with_logger(Box::new(CountingLogger {
                enabled: true,
                ..Default::default()
            }));
        assert!(multi_logger.enabled(&Metadata::builder().level(Level::Error).build()));
    }

    #[test]
    fn test_fan_out() {
        let enabled = CountingLogger {
            enabled: true,
            ..Default::default()
        };
        let enabled_count = enabled.received.clone();
        let disabled = CountingLogger::default();
        let disabled_count = disabled.received.clone();

        let multi_logger = MultiLogger::new()
            .with_logger(Box::new(enabled))
            .with_logger(Box::new(disabled));

        multi_logger.log(&record("bulwark", Level::Info));
        assert_eq!(enabled_count.load(Ordering::Relaxed), 1);
        assert_eq!(disabled_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_target_filter() {
        let logger = CountingLogger {
            enabled: true,
            ..Default::default()
        };
        let count = logger.received.clone();

        let multi_logger = MultiLogger::new()
            .with_logger(Box::new(logger))
            .with_target_filter("reqwest", LevelFilter::Info)
            .with_target_filter("reqwest::connect", LevelFilter::Off);

        multi_logger.log(&record("reqwest::blocking", Level::Debug));
        assert_eq!(count.load(Ordering::Relaxed), 0);

        multi_logger.log(&record("reqwest::blocking", Level::Info));
        assert_eq!(count.load(Ordering::Relaxed), 1);

        multi_logger.log(&record("reqwest::connect", Level::Error));
        assert_eq!(count.load(Ordering::Relaxed), 1);

        multi_logger.log(&record("bulwark::engine", Level::Trace));
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
