//! Disk validation and the optional destructive wipe.

use log::{info, warn};

use bulwark_api::{
    constants::WIPE_CONFIRMATION_TOKEN,
    error::{BulwarkError, InitializationError, InvalidInputError, ReportError},
};

use crate::{
    engine::{EngineContext, Step, Subsystem},
    host::Host,
    subsystems::pool,
};

pub struct DiskSubsystem;

impl Subsystem for DiskSubsystem {
    fn name(&self) -> &'static str {
        "disks"
    }

    fn steps<'a>(&self, ctx: &'a EngineContext) -> Vec<Step<'a>> {
        let storage = &ctx.spec.storage;
        if !storage.provision {
            return Vec::new();
        }

        let mut steps = vec![Step::gate("validate block devices", move |host| {
            validate_devices(host, &storage.devices)
        })];

        if storage.wipe_disks {
            // An existing pool is never wiped; rebuilding it is a manual decision.
            steps.push(Step::new(
                "wipe disks",
                move |host| pool::backend(storage).pool_exists(host),
                move |host| wipe_devices(host, &storage.devices),
            ));
        }

        steps
    }
}

/// Fails on the first configured path that is not a block device.
fn validate_devices(
    host: &mut dyn Host,
    devices: &[std::path::PathBuf],
) -> Result<(), BulwarkError> {
    for device in devices {
        let invalid = || InvalidInputError::InvalidBlockDevice {
            path: device.display().to_string(),
        };
        if !host.is_block_device(device).structured(invalid())? {
            return Err(BulwarkError::new(invalid()));
        }
    }
    Ok(())
}

/// Asks for the confirmation token, then erases every device. Per-device
/// failures are only reported: a disk that is already clean may complain.
fn wipe_devices(host: &mut dyn Host, devices: &[std::path::PathBuf]) -> Result<(), BulwarkError> {
    let listing = devices
        .iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let answer = host
        .confirm(&format!(
            "All data on {listing} will be destroyed. Type '{WIPE_CONFIRMATION_TOKEN}' to continue: "
        ))
        .structured(InitializationError::ReadConfirmation)?;

    if answer.trim() != WIPE_CONFIRMATION_TOKEN {
        return Err(BulwarkError::new(InvalidInputError::WipeNotConfirmed {
            expected: WIPE_CONFIRMATION_TOKEN,
        }));
    }

    for device in devices {
        info!("Wiping '{}'", device.display());
        if let Err(e) = host.wipe_signatures(device) {
            warn!("Failed to erase signatures on '{}': {e:#}", device.display());
        }
        if let Err(e) = host.zap_partition_table(device) {
            warn!(
                "Failed to erase partition table on '{}': {e:#}",
                device.display()
            );
        }
    }
    Ok(())
}
