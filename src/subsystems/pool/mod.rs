//! Storage pool construction. The backend is picked once from the
//! configuration and contributes its own steps.

use std::path::Path;

use anyhow::Error;
use log::debug;

use bulwark_api::config::{PoolBackendKind, Storage};

use crate::{
    engine::{EngineContext, Step, Subsystem},
    host::Host,
};

mod lvm;
mod zfs;

pub use lvm::LvmBackend;
pub use zfs::ZfsBackend;

/// Steps borrow the storage configuration, not the backend, so they outlive
/// the backend value.
pub trait PoolBackend<'a> {
    fn name(&self) -> &'static str;

    /// Whether the pool itself already exists on the host.
    fn pool_exists(&self, host: &mut dyn Host) -> Result<bool, Error>;

    /// Steps that build and mount the pool.
    fn steps(&self) -> Vec<Step<'a>>;

    /// Where the pool ends up mounted.
    fn mount_path(&self) -> &Path;
}

/// Selects the backend configured for `storage`.
pub fn backend<'a>(storage: &'a Storage) -> Box<dyn PoolBackend<'a> + 'a> {
    match storage.backend {
        PoolBackendKind::Zfs => Box::new(ZfsBackend::new(storage)),
        PoolBackendKind::Lvm => Box::new(LvmBackend::new(storage)),
    }
}

pub struct PoolSubsystem;

impl Subsystem for PoolSubsystem {
    fn name(&self) -> &'static str {
        "storage-pool"
    }

    fn steps<'a>(&self, ctx: &'a EngineContext) -> Vec<Step<'a>> {
        let storage = &ctx.spec.storage;
        if !storage.provision {
            return Vec::new();
        }

        let backend = backend(storage);
        debug!(
            "Building {} pool mounted at '{}'",
            backend.name(),
            backend.mount_path().display()
        );
        backend.steps()
    }
}
