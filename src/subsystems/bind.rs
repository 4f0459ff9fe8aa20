//! Exposes the pool at the path the backup software expects.

use bulwark_api::error::{ProvisioningError, ReportError};
use osutils::tabfile::TabFileEntry;

use crate::engine::{EngineContext, Step, Subsystem};

pub struct BindMountSubsystem;

impl Subsystem for BindMountSubsystem {
    fn name(&self) -> &'static str {
        "bind-mount"
    }

    fn steps<'a>(&self, ctx: &'a EngineContext) -> Vec<Step<'a>> {
        let source = ctx.spec.storage.mount_path.as_path();
        let bind = &ctx.spec.bind_mount;
        let target = bind.target.as_path();

        vec![
            Step::new(
                format!("create bind target '{}'", target.display()),
                move |host| host.path_exists(target),
                move |host| {
                    host.create_dir_all(target)
                        .structured(ProvisioningError::CreateDirectory {
                            path: target.display().to_string(),
                        })
                },
            ),
            Step::new(
                format!("register bind mount '{}'", target.display()),
                move |host| Ok(host.read_fstab()?.has_bind(source, target)),
                move |host| {
                    host.append_fstab(&TabFileEntry::new_bind(source, target))
                        .structured(ProvisioningError::RegisterMount {
                            mount_point: target.display().to_string(),
                        })
                },
            ),
            Step::new(
                format!("bind-mount '{}'", target.display()),
                move |host| host.is_mountpoint(target),
                move |host| {
                    host.bind_mount(source, target)
                        .structured(ProvisioningError::BindMount {
                            source_path: source.display().to_string(),
                            target: target.display().to_string(),
                        })
                },
            ),
            // The service account only exists once the packages are installed
            Step::gate(format!("hand '{}' to the backup user", target.display()), move |host| {
                host.chown(target, &bind.owner, &bind.group)
                    .structured(ProvisioningError::ChangeOwnership {
                        path: target.display().to_string(),
                        owner: format!("{}:{}", bind.owner, bind.group),
                    })
            })
            .best_effort(),
        ]
    }
}
