use bulwark_api::{config::ProvisionConfig, error::BulwarkError};

use crate::{host::Host, subsystems::packages};

/// Everything the subsystems need to build their steps. Immutable for the
/// whole run.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub spec: ProvisionConfig,

    /// Package release series, resolved once from the override or the host OS.
    pub series: String,
}

impl EngineContext {
    pub fn new(
        spec: ProvisionConfig,
        series_override: Option<&str>,
        host: &mut dyn Host,
    ) -> Result<Self, BulwarkError> {
        let series = packages::resolve_series(host, &spec.packages, series_override)?;
        Ok(Self { spec, series })
    }
}
