use log::{debug, error, info};

use bulwark_api::error::BulwarkError;

use crate::{
    host::Host,
    subsystems::{
        bind::BindMountSubsystem, catalog::CatalogSubsystem, disks::DiskSubsystem,
        packages::PackageSubsystem, pool::PoolSubsystem, services::ServiceSubsystem,
    },
};

mod context;
pub mod preflight;
mod report;
mod step;

pub use context::EngineContext;
pub use report::{RunMode, RunReport, StepOutcome, StepRecord};
pub use step::{Step, StepPolicy};

pub(crate) trait Subsystem {
    fn name(&self) -> &'static str;

    /// Steps this subsystem contributes, in execution order. Empty when the
    /// configuration leaves the subsystem out.
    fn steps<'a>(&self, ctx: &'a EngineContext) -> Vec<Step<'a>>;
}

/// All subsystems, in pipeline order.
fn subsystems() -> Vec<Box<dyn Subsystem>> {
    vec![
        Box::new(DiskSubsystem),
        Box::new(PoolSubsystem),
        Box::new(BindMountSubsystem),
        Box::new(PackageSubsystem),
        Box::new(CatalogSubsystem),
        Box::new(ServiceSubsystem),
    ]
}

/// Drives the steps of every subsystem against a host and records what
/// happened.
pub struct Engine<'h> {
    host: &'h mut dyn Host,
    report: RunReport,
}

impl<'h> Engine<'h> {
    pub fn new(host: &'h mut dyn Host) -> Self {
        Self {
            host,
            report: RunReport::new(RunMode::Provision),
        }
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Runs the whole pipeline, stopping at the first fatal failure.
    pub fn provision(&mut self, ctx: &EngineContext) -> Result<(), BulwarkError> {
        self.report = RunReport::new(RunMode::Provision);
        let res = self.run_subsystems(ctx);
        self.report.finish();

        match &res {
            Ok(()) => info!("Provisioning finished: {}", self.report.summary()),
            Err(_) => error!("Provisioning aborted: {}", self.report.summary()),
        }
        res
    }

    fn run_subsystems(&mut self, ctx: &EngineContext) -> Result<(), BulwarkError> {
        for subsystem in subsystems() {
            let steps = subsystem.steps(ctx);
            if steps.is_empty() {
                debug!("Subsystem '{}' has nothing to do", subsystem.name());
                continue;
            }

            info!("Provisioning subsystem '{}'", subsystem.name());
            for step in &steps {
                match step.execute(&mut *self.host) {
                    Ok(outcome) => self.report.record(subsystem.name(), step.name(), outcome),
                    Err(e) => {
                        self.report.record(
                            subsystem.name(),
                            step.name(),
                            StepOutcome::Failed {
                                cause: e.kind().to_string(),
                            },
                        );
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates every existence check without running any action.
    pub fn plan(&mut self, ctx: &EngineContext) {
        self.report = RunReport::new(RunMode::Plan);
        for subsystem in subsystems() {
            for step in subsystem.steps(ctx) {
                let outcome = if step.is_satisfied(&mut *self.host) {
                    StepOutcome::Skipped
                } else {
                    StepOutcome::Pending
                };
                self.report.record(subsystem.name(), step.name(), outcome);
            }
        }
        self.report.finish();
    }
}

#[cfg(test)]
mod tests;
