use std::path::Path;

use log::info;

use bulwark_api::{
    config::ProvisionConfig,
    error::{BulwarkError, BulwarkResultExt},
};

pub mod cli;
mod engine;
mod host;
mod io_utils;
mod logging;
mod subsystems;

pub use engine::{RunMode, RunReport, StepOutcome, StepRecord};
pub use host::{Host, LiveHost};
pub use logging::{background_log::BackgroundLog, multilog::MultiLogger};

use engine::{preflight, Engine, EngineContext};

/// Version reported by the binary. Release builds set `BULWARK_VERSION`.
pub const BULWARK_VERSION: &str = match option_env!("BULWARK_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// A loaded and validated provisioning configuration, ready to be applied.
pub struct Bulwark {
    spec: ProvisionConfig,
}

impl Bulwark {
    pub fn new(spec: ProvisionConfig) -> Self {
        Self { spec }
    }

    /// Loads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, BulwarkError> {
        let spec = ProvisionConfig::load(path).message(format!(
            "Failed to load configuration from '{}'",
            path.display()
        ))?;
        Ok(Self::new(spec))
    }

    pub fn spec(&self) -> &ProvisionConfig {
        &self.spec
    }

    /// Runs the full pipeline. The report is returned whenever the pipeline
    /// started, including when it aborted.
    pub fn provision(
        &self,
        host: &mut dyn Host,
        series_override: Option<&str>,
    ) -> (Result<(), BulwarkError>, Option<RunReport>) {
        if let Err(e) = preflight::check_root().and_then(|()| preflight::check_tools(&self.spec)) {
            return (Err(e).message("Preflight checks failed"), None);
        }
        let ctx = match EngineContext::new(self.spec.clone(), series_override, &mut *host) {
            Ok(ctx) => ctx,
            Err(e) => return (Err(e), None),
        };

        let mut engine = Engine::new(host);
        let res = engine.provision(&ctx);
        (res, Some(engine.into_report()))
    }

    /// Evaluates every step's check without changing the host.
    pub fn plan(
        &self,
        host: &mut dyn Host,
        series_override: Option<&str>,
    ) -> Result<RunReport, BulwarkError> {
        preflight::check_tools(&self.spec).message("Preflight checks failed")?;
        let ctx = EngineContext::new(self.spec.clone(), series_override, host)?;

        let mut engine = Engine::new(host);
        engine.plan(&ctx);
        let report = engine.into_report();
        info!("Plan: {}", report.summary());
        Ok(report)
    }

    /// Resolves the package release series for this host.
    pub fn series(
        &self,
        host: &mut dyn Host,
        series_override: Option<&str>,
    ) -> Result<String, BulwarkError> {
        subsystems::packages::resolve_series(host, &self.spec.packages, series_override)
    }
}
