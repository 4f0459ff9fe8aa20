use log::debug;

use bulwark_api::error::{ProvisioningError, ReportError};

use crate::engine::{EngineContext, Step, Subsystem};

/// Step enabling and starting one unit.
fn activate(unit: &str) -> Step<'_> {
    Step::new(
        format!("activate service '{unit}'"),
        move |host| Ok(host.service_enabled(unit)? && host.service_active(unit)?),
        move |host| {
            host.enable_service(unit)
                .structured(ProvisioningError::StartService { unit: unit.into() })
        },
    )
}

pub struct ServiceSubsystem;

impl Subsystem for ServiceSubsystem {
    fn name(&self) -> &'static str {
        "services"
    }

    fn steps<'a>(&self, ctx: &'a EngineContext) -> Vec<Step<'a>> {
        let services = &ctx.spec.services;
        debug!(
            "Activating {} core and {} auxiliary services",
            services.core.len(),
            services.auxiliary.len()
        );

        // A failed auxiliary unit only degrades the web console
        services
            .core
            .iter()
            .map(|unit| activate(unit))
            .chain(
                services
                    .auxiliary
                    .iter()
                    .map(|unit| activate(unit).best_effort()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use bulwark_api::{
        config::ProvisionConfig,
        error::{BulwarkError, ErrorKind},
    };

    use crate::{engine::StepOutcome, host::fake::FakeHost};

    use super::*;

    fn context() -> EngineContext {
        EngineContext {
            spec: ProvisionConfig::default(),
            series: "bookworm".into(),
        }
    }

    fn run(ctx: &EngineContext, host: &mut FakeHost) -> Result<Vec<StepOutcome>, BulwarkError> {
        ServiceSubsystem
            .steps(ctx)
            .iter()
            .map(|step| step.execute(host))
            .collect()
    }

    #[test]
    fn test_activates_all_units() {
        let ctx = context();
        let mut host = FakeHost::new();

        run(&ctx, &mut host).unwrap();
        assert_eq!(
            host.calls,
            vec![
                "systemctl enable --now bacula-dir",
                "systemctl enable --now bacula-sd",
                "systemctl enable --now bacula-fd",
                "systemctl enable --now apache2",
            ]
        );

        host.calls.clear();
        let outcomes = run(&ctx, &mut host).unwrap();
        assert!(outcomes.iter().all(|o| *o == StepOutcome::Skipped));
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_enabled_but_stopped_unit_is_started() {
        let ctx = context();
        let mut host = FakeHost::new();
        for unit in ["bacula-dir", "bacula-sd", "bacula-fd", "apache2"] {
            host.start_service(unit);
        }
        host.active_services.remove("bacula-sd");

        run(&ctx, &mut host).unwrap();
        assert_eq!(host.calls, vec!["systemctl enable --now bacula-sd"]);
    }

    #[test]
    fn test_core_failure_is_fatal() {
        let ctx = context();
        let mut host = FakeHost::new();
        host.fail("enable_service:bacula-sd");

        let err = run(&ctx, &mut host).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Provisioning(ProvisioningError::StartService {
                unit: "bacula-sd".into()
            })
        );
        assert!(host.calls_to("systemctl enable --now bacula-fd").is_empty());
    }

    #[test]
    fn test_auxiliary_failure_is_tolerated() {
        let ctx = context();
        let mut host = FakeHost::new();
        host.fail("enable_service:apache2");

        let outcomes = run(&ctx, &mut host).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[3], StepOutcome::Tolerated { .. }));
        assert!(host.enabled_services.contains("bacula-fd"));
    }
}
