use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bulwark_api::error::{BulwarkError, InitializationError, ReportError};

/// Result of evaluating one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepOutcome {
    /// The check reported the step as already satisfied.
    Skipped,
    /// The action ran and succeeded.
    Applied,
    /// A best-effort action failed and the run continued.
    Tolerated { cause: String },
    /// The action detected a defect and left it for the operator.
    Deferred { cause: String },
    /// A fatal action failed and aborted the run.
    Failed { cause: String },
    /// Plan mode only: the action would run.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Provision,
    Plan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub subsystem: &'static str,
    pub step: String,
    pub outcome: StepOutcome,
}

/// Ordered record of what one run did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub mode: RunMode,
    pub started: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            started: Utc::now(),
            finished: None,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, subsystem: &'static str, step: &str, outcome: StepOutcome) {
        self.steps.push(StepRecord {
            subsystem,
            step: step.to_string(),
            outcome,
        });
    }

    pub fn finish(&mut self) {
        self.finished = Some(Utc::now());
    }

    /// Outcome recorded for the named step, if it was evaluated.
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }

    fn count(&self, predicate: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|r| predicate(&r.outcome)).count()
    }

    /// One-line summary for the end of the run.
    pub fn summary(&self) -> String {
        match self.mode {
            RunMode::Provision => format!(
                "{} steps: {} applied, {} already satisfied, {} tolerated failures, {} deferred",
                self.steps.len(),
                self.count(|o| *o == StepOutcome::Applied),
                self.count(|o| *o == StepOutcome::Skipped),
                self.count(|o| matches!(o, StepOutcome::Tolerated { .. })),
                self.count(|o| matches!(o, StepOutcome::Deferred { .. })),
            ),
            RunMode::Plan => format!(
                "{} steps: {} would run, {} already satisfied",
                self.steps.len(),
                self.count(|o| *o == StepOutcome::Pending),
                self.count(|o| *o == StepOutcome::Skipped),
            ),
        }
    }

    /// Writes the report as YAML to `path`.
    pub fn write(&self, path: &Path) -> Result<(), BulwarkError> {
        let report_error = || InitializationError::WriteReport {
            path: path.display().to_string(),
        };
        let yaml = serde_yaml::to_string(self).structured(report_error())?;
        std::fs::write(path, yaml).structured(report_error())
    }
}
