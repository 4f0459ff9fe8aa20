//! Package management through `apt-get` and `dpkg-query`.

use anyhow::{Context, Error};

use crate::dependencies::{is_execution_failure, Command, Dependency};

/// Status string dpkg reports for a fully installed package.
const INSTALLED_STATUS: &str = "install ok installed";

/// Every apt invocation runs without prompts.
fn apt_get() -> Command {
    let mut cmd = Dependency::AptGet.cmd();
    cmd.env("DEBIAN_FRONTEND", "noninteractive");
    cmd
}

pub fn update() -> Result<(), Error> {
    apt_get()
        .arg("update")
        .run_and_check()
        .context("Failed to refresh the package index")
}

pub fn install(packages: &[String]) -> Result<(), Error> {
    apt_get()
        .args(["install", "-y"])
        .args(packages)
        .run_and_check()
        .with_context(|| format!("Failed to install packages: {}", packages.join(" ")))
}

/// Lets apt resolve broken or half-configured dependencies.
pub fn fix_broken() -> Result<(), Error> {
    apt_get()
        .args(["install", "-f", "-y"])
        .run_and_check()
        .context("Failed to repair broken package dependencies")
}

/// Whether dpkg reports `package` as fully installed. Unknown packages make
/// dpkg-query fail, which counts as not installed.
pub fn is_installed(package: &str) -> Result<bool, Error> {
    match Dependency::DpkgQuery
        .cmd()
        .args(["-W", "-f=${Status}", package])
        .output_and_check()
    {
        Ok(status) => Ok(parse_status(&status)),
        Err(e) if is_execution_failure(&e) => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to query package status of '{package}'"))
        }
    }
}

fn parse_status(status: &str) -> bool {
    status.trim() == INSTALLED_STATUS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert!(parse_status("install ok installed"));
        assert!(parse_status("install ok installed\n"));
        assert!(!parse_status("deinstall ok config-files"));
        assert!(!parse_status("install ok half-configured"));
        assert!(!parse_status(""));
    }
}
