use indoc::indoc;

use bulwark_api::{
    config::ProvisionConfig,
    error::{ErrorKind, InvalidInputError, ProvisioningError},
};

use crate::host::fake::{FakeDatabase, FakeHost};

use super::*;

const KEY_URL: &str =
    "https://www.bacula.org/downloads/Bacula-4096-Distribution-Verification-key.asc";

fn context(yaml: &str) -> EngineContext {
    EngineContext {
        spec: ProvisionConfig::from_yaml(yaml).unwrap(),
        series: "bookworm".into(),
    }
}

fn zfs_context() -> EngineContext {
    context(indoc! {r#"
        storage:
          devices: [/dev/sdb, /dev/sdc, /dev/sdd]
          zfs:
            layout: raidz1
    "#})
}

fn fresh_host() -> FakeHost {
    let mut host = FakeHost::with_block_devices(&["/dev/sdb", "/dev/sdc", "/dev/sdd"]);
    host.downloads.insert(KEY_URL.into(), b"key".to_vec());
    host
}

#[test]
fn test_provision_fresh_host() {
    let ctx = zfs_context();
    let mut host = fresh_host();
    let mut engine = Engine::new(&mut host);

    engine.provision(&ctx).unwrap();
    let report = engine.into_report();
    assert!(report.finished.is_some());
    assert!(report
        .steps
        .iter()
        .all(|r| matches!(r.outcome, StepOutcome::Applied)));

    // Subsystems run in pipeline order
    let order = [
        "zpool create",
        "mount --bind",
        "apt-get install",
        "CREATE DATABASE",
        "systemctl enable --now bacula-dir",
    ];
    let positions: Vec<usize> = order.iter().map(|c| host.position(c).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(
        host.calls_to("zpool create"),
        vec!["zpool create backup raidz1 ashift=12 /dev/sdb /dev/sdc /dev/sdd"]
    );
    assert!(host.mounted.contains(std::path::Path::new("/opt/bacula/archive")));
    assert_eq!(host.databases["bacula"].encoding, "UTF8");
    assert!(host.active_services.contains("apache2"));
}

#[test]
fn test_second_run_changes_nothing() {
    let ctx = zfs_context();
    let mut host = fresh_host();
    Engine::new(&mut host).provision(&ctx).unwrap();
    host.calls.clear();

    let mut engine = Engine::new(&mut host);
    engine.provision(&ctx).unwrap();
    let report = engine.into_report();

    // Only the gates run again; of those, only the ownership change mutates
    assert_eq!(host.calls, vec!["chown bacula:bacula /opt/bacula/archive"]);
    let applied: Vec<&str> = report
        .steps
        .iter()
        .filter(|r| r.outcome == StepOutcome::Applied)
        .map(|r| r.step.as_str())
        .collect();
    assert_eq!(
        applied,
        vec![
            "validate block devices",
            "hand '/opt/bacula/archive' to the backup user",
            "wait for database server",
        ]
    );
}

#[test]
fn test_invalid_device_aborts_before_pool() {
    let ctx = zfs_context();
    let mut host = fresh_host();
    host.block_devices.remove(std::path::Path::new("/dev/sdc"));

    let mut engine = Engine::new(&mut host);
    let err = engine.provision(&ctx).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::InvalidInput(InvalidInputError::InvalidBlockDevice {
            path: "/dev/sdc".into()
        })
    );

    let report = engine.into_report();
    assert_eq!(report.steps.len(), 1);
    assert!(matches!(
        report.outcome("validate block devices"),
        Some(StepOutcome::Failed { .. })
    ));
    assert!(host.calls.is_empty());
}

#[test]
fn test_unconfirmed_wipe_aborts() {
    let ctx = context(indoc! {r#"
        storage:
          devices: [/dev/sdb, /dev/sdc, /dev/sdd]
          wipeDisks: true
    "#});
    let mut host = fresh_host();
    host.confirmation = "yes".into();

    let err = Engine::new(&mut host).provision(&ctx).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::InvalidInput(InvalidInputError::WipeNotConfirmed { expected: "WIPE" })
    );
    assert!(host.calls.is_empty());
}

#[test]
fn test_confirmed_wipe_precedes_pool() {
    let ctx = context(indoc! {r#"
        storage:
          devices: [/dev/sdb, /dev/sdc, /dev/sdd]
          wipeDisks: true
    "#});
    let mut host = fresh_host();
    host.confirmation = "WIPE\n".into();

    Engine::new(&mut host).provision(&ctx).unwrap();
    assert_eq!(host.calls_to("wipefs").len(), 3);
    assert!(host.position("sgdisk /dev/sdd").unwrap() < host.position("zpool create").unwrap());

    // The pool exists now, so the disks are left alone
    host.calls.clear();
    host.confirmation.clear();
    Engine::new(&mut host).provision(&ctx).unwrap();
    assert!(host.calls_to("wipefs").is_empty());
}

#[test]
fn test_skip_storage() {
    let ctx = context(indoc! {r#"
        storage:
          provision: false
    "#});
    let mut host = fresh_host();

    let mut engine = Engine::new(&mut host);
    engine.provision(&ctx).unwrap();
    let report = engine.into_report();

    assert!(report
        .steps
        .iter()
        .all(|r| r.subsystem != "disks" && r.subsystem != "storage-pool"));
    assert!(host.calls_to("zpool").is_empty());
    assert_eq!(host.calls_to("mount --bind").len(), 1);
}

#[test]
fn test_warn_policy_defers_catalog_repair() {
    let ctx = context(indoc! {r#"
        storage:
          provision: false
        catalog:
          repair: warn
    "#});
    let mut host = fresh_host();
    host.databases.insert(
        "bacula".into(),
        FakeDatabase {
            encoding: "SQL_ASCII".into(),
            collation: "C".into(),
        },
    );

    let mut engine = Engine::new(&mut host);
    engine.provision(&ctx).unwrap();
    let report = engine.into_report();

    assert!(matches!(
        report.outcome("ensure catalog 'bacula' is UTF-8"),
        Some(StepOutcome::Deferred { cause }) if cause.contains("SQL_ASCII")
    ));
    assert!(report.summary().ends_with(", 1 deferred"));

    // The run carries on past the deferred catalog
    assert!(report.finished.is_some());
    assert!(host.calls_to("DROP").is_empty());
    assert_eq!(host.databases["bacula"].encoding, "SQL_ASCII");
    assert!(!host.calls_to("systemctl enable --now bacula-dir").is_empty());
}

#[test]
fn test_failure_records_and_stops() {
    let ctx = zfs_context();
    let mut host = fresh_host();
    host.install_failures = 2;

    let mut engine = Engine::new(&mut host);
    let err = engine.provision(&ctx).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::Provisioning(ProvisioningError::InstallPackages)
    );

    let report = engine.into_report();
    let last = report.steps.last().unwrap();
    assert_eq!(last.subsystem, "packages");
    assert_eq!(last.step, "install packages");
    assert!(matches!(last.outcome, StepOutcome::Failed { .. }));
    assert!(report.finished.is_some());

    // Nothing after the failed step ran
    assert!(host.calls_to("CREATE").is_empty());
    assert!(host.calls_to("systemctl").is_empty());
}

#[test]
fn test_plan_runs_no_actions() {
    let ctx = zfs_context();
    let mut host = fresh_host();

    let mut engine = Engine::new(&mut host);
    engine.plan(&ctx);
    let report = engine.into_report();

    assert_eq!(report.mode, RunMode::Plan);
    assert!(report
        .steps
        .iter()
        .all(|r| r.outcome == StepOutcome::Pending));
    assert_eq!(report.outcome("create ZFS pool 'backup'"), Some(&StepOutcome::Pending));
    assert!(host.calls.is_empty());
    assert!(host.pools.is_empty());

    // After provisioning only the gates are still pending
    Engine::new(&mut host).provision(&ctx).unwrap();
    host.calls.clear();

    let mut engine = Engine::new(&mut host);
    engine.plan(&ctx);
    let report = engine.into_report();
    let pending = report
        .steps
        .iter()
        .filter(|r| r.outcome == StepOutcome::Pending)
        .count();
    assert_eq!(pending, 3);
    assert!(host.calls.is_empty());
}
