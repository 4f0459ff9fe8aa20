//! Service control through `systemctl`.
//!
//! Status queries exit non-zero for units that are not enabled or not
//! active, so those exits are read as `false` rather than errors.

use anyhow::{Context, Error};

use crate::dependencies::{is_execution_failure, Dependency};

fn query(verb: &str, unit: &str) -> Result<bool, Error> {
    match Dependency::Systemctl
        .cmd()
        .args([verb, "--quiet", unit])
        .run_and_check()
    {
        Ok(()) => Ok(true),
        Err(e) if is_execution_failure(&e) => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to run 'systemctl {verb}' on '{unit}'")),
    }
}

pub fn is_active(unit: &str) -> Result<bool, Error> {
    query("is-active", unit)
}

pub fn is_enabled(unit: &str) -> Result<bool, Error> {
    query("is-enabled", unit)
}

/// Enables `unit` at boot and starts it right away.
pub fn enable_now(unit: &str) -> Result<(), Error> {
    Dependency::Systemctl
        .cmd()
        .args(["enable", "--now", unit])
        .run_and_check()
        .with_context(|| format!("Failed to enable and start '{unit}'"))
}

pub fn stop(unit: &str) -> Result<(), Error> {
    Dependency::Systemctl
        .cmd()
        .args(["stop", unit])
        .run_and_check()
        .with_context(|| format!("Failed to stop '{unit}'"))
}
