use anyhow::Error;
use log::{debug, info, warn};

use bulwark_api::error::{BulwarkError, BulwarkResultExt};

use crate::host::Host;

use super::report::StepOutcome;

type CheckFn<'a> = Box<dyn Fn(&mut dyn Host) -> Result<bool, Error> + 'a>;
type ActionFn<'a> = Box<dyn Fn(&mut dyn Host) -> Result<StepOutcome, BulwarkError> + 'a>;

/// What happens to the run when a step's action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Abort the run.
    Fatal,
    /// Log a warning and continue with the next step.
    BestEffort,
}

/// A named provisioning step: an existence check guarding an action.
///
/// The action only runs when the check does not report the step as already
/// satisfied. A check that fails is read as "not satisfied", since probing a
/// resource that was never created commonly errors out.
pub struct Step<'a> {
    name: String,
    check: CheckFn<'a>,
    action: ActionFn<'a>,
    policy: StepPolicy,
}

impl<'a> Step<'a> {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&mut dyn Host) -> Result<bool, Error> + 'a,
        action: impl Fn(&mut dyn Host) -> Result<(), BulwarkError> + 'a,
    ) -> Self {
        Self::with_outcome(name, check, move |host| {
            action(host).map(|()| StepOutcome::Applied)
        })
    }

    /// A step whose action reports its own outcome, for actions that may
    /// detect a defect and leave it for the operator instead of fixing it.
    pub fn with_outcome(
        name: impl Into<String>,
        check: impl Fn(&mut dyn Host) -> Result<bool, Error> + 'a,
        action: impl Fn(&mut dyn Host) -> Result<StepOutcome, BulwarkError> + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
            action: Box::new(action),
            policy: StepPolicy::Fatal,
        }
    }

    /// A step without a natural existence check. Its action runs every time.
    pub fn gate(
        name: impl Into<String>,
        action: impl Fn(&mut dyn Host) -> Result<(), BulwarkError> + 'a,
    ) -> Self {
        Self::new(name, |_| Ok(false), action)
    }

    pub fn best_effort(self) -> Self {
        Self {
            policy: StepPolicy::BestEffort,
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> StepPolicy {
        self.policy
    }

    /// Evaluates the existence check.
    pub(crate) fn is_satisfied(&self, host: &mut dyn Host) -> bool {
        match (self.check)(host) {
            Ok(satisfied) => satisfied,
            Err(e) => {
                debug!(
                    "Check of step '{}' failed, treating it as not satisfied: {e:#}",
                    self.name
                );
                false
            }
        }
    }

    /// Runs the step unless it is already satisfied.
    pub(crate) fn execute(&self, host: &mut dyn Host) -> Result<StepOutcome, BulwarkError> {
        if self.is_satisfied(host) {
            info!("Step '{}' is already satisfied, nothing to do", self.name);
            return Ok(StepOutcome::Skipped);
        }

        info!("Running step '{}'", self.name);
        match (self.action)(host) {
            Ok(StepOutcome::Deferred { cause }) => {
                warn!("Step '{}' left a defect in place: {cause}", self.name);
                Ok(StepOutcome::Deferred { cause })
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => match self.policy {
                StepPolicy::Fatal => Err(e).message(format!("Step '{}' failed", self.name)),
                StepPolicy::BestEffort => {
                    warn!(
                        "Best-effort step '{}' failed, continuing: {e:?}",
                        self.name
                    );
                    Ok(StepOutcome::Tolerated {
                        cause: e.kind().to_string(),
                    })
                }
            },
        }
    }
}
