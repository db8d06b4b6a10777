//! Linux: rewrite the resolver file.
//!
//! The resolver file is global, so there is no per-interface fan-out. The
//! file is marked immutable after writing so DHCP clients and
//! NetworkManager do not overwrite it.

use super::PlatformStrategy;
use crate::address::DnsServerList;
use crate::backup::BackupStore;
use crate::command::{BestEffort, SystemCommand};
use crate::context::OpContext;
use crate::error::Result;
use crate::interfaces::WHOLE_MACHINE;
use crate::outcome::{Outcome, Report};
use crate::platform::Platform;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;

/// First-line marker of every resolver file this crate writes.
pub const GENERATED_MARKER: &str = "# generated by dns-changer";

/// `/etc/resolv.conf` strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxResolvConf;

#[async_trait]
impl PlatformStrategy for LinuxResolvConf {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    async fn apply(&self, servers: &DnsServerList, ctx: &OpContext<'_>) -> Result<Outcome> {
        ctx.guard
            .ensure_elevated(Platform::Linux, ctx.runner.as_ref())
            .await?;

        let resolv_conf = ctx.paths.resolv_conf();
        let backup_path = ctx.paths.linux_backup(&ctx.options.backup_name);

        if ctx.options.make_backup {
            let generated = is_generated(resolv_conf);
            if generated && backup_path.is_file() {
                // Backing up our own output would lose the original.
                narrate!(
                    ctx.verbose(),
                    path = %backup_path.display(),
                    "Resolver file already generated by dns-changer, keeping existing backup"
                );
            } else if generated {
                tracing::warn!(
                    path = %backup_path.display(),
                    "No backup under this name yet, saving the generated resolver file"
                );
                self.snapshot(ctx).await?;
            } else if resolv_conf.exists() {
                narrate!(ctx.verbose(), "Backing up resolver file");
                self.snapshot(ctx).await?;
            } else {
                tracing::warn!(
                    path = %resolv_conf.display(),
                    "No resolver file to back up"
                );
            }
        }

        if ctx.options.lock_resolver {
            // Fails on filesystems without attribute support; the write
            // below is the real check.
            let unlock = chattr("-i", resolv_conf);
            let output = ctx.run(&unlock).await;
            if !output.success() {
                tracing::debug!(reason = %output.failure_reason(), "Could not clear immutable flag");
            }
        }

        narrate!(ctx.verbose(), path = %resolv_conf.display(), "Writing resolver file");
        std::fs::write(resolv_conf, generate_resolv_conf(servers, &backup_path))?;

        if ctx.options.lock_resolver {
            narrate!(ctx.verbose(), "Marking resolver file immutable");
            ctx.run_checked(&chattr("+i", resolv_conf)).await?;
        }

        flush_caches(ctx).await;
        narrate!(ctx.verbose(), servers = %servers, "DNS servers set");
        Ok(Outcome::Succeeded(Report {
            succeeded: vec![WHOLE_MACHINE.to_string()],
            ..Report::default()
        }))
    }

    async fn restore(&self, ctx: &OpContext<'_>) -> Result<Outcome> {
        ctx.guard
            .ensure_elevated(Platform::Linux, ctx.runner.as_ref())
            .await?;

        let resolv_conf = ctx.paths.resolv_conf();
        let name = ctx.options.backup_name.as_str();
        let store = BackupStore::new(ctx.paths);

        if ctx.options.lock_resolver {
            narrate!(ctx.verbose(), "Clearing immutable flag");
            ctx.run_checked(&chattr("-i", resolv_conf)).await?;
        }

        let backup_path = ctx.paths.linux_backup(name);
        if !store.exists(Platform::Linux, name) {
            narrate!(ctx.verbose(), path = %backup_path.display(), "No backup found, nothing to restore");
            return Ok(Outcome::skipped(format!(
                "no backup at {}",
                backup_path.display()
            )));
        }
        narrate!(ctx.verbose(), path = %backup_path.display(), "Restoring backup");

        match std::fs::remove_file(resolv_conf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::copy(&backup_path, resolv_conf)?;

        if ctx.options.remove_backup && store.remove(Platform::Linux, name)? {
            narrate!(ctx.verbose(), path = %backup_path.display(), "Removed backup");
        }

        flush_caches(ctx).await;
        narrate!(ctx.verbose(), path = %resolv_conf.display(), "Resolver file restored");
        Ok(Outcome::Succeeded(Report {
            succeeded: vec![WHOLE_MACHINE.to_string()],
            ..Report::default()
        }))
    }
}

/// Resolver file content: a marker line naming the backup, then the two
/// servers.
///
/// ```text
/// # generated by dns-changer, backed up to '/etc/resolv.conf.before-dns-changer'
/// nameserver 1.1.1.1
/// nameserver 1.0.0.1
/// ```
#[must_use]
pub fn generate_resolv_conf(servers: &DnsServerList, backup_path: &Path) -> String {
    format!(
        "{GENERATED_MARKER}, backed up to '{backup}'\nnameserver {primary}\nnameserver {secondary}\n",
        backup = backup_path.display(),
        primary = servers.primary(),
        secondary = servers.secondary(),
    )
}

/// Checks whether the resolver file carries the generated marker.
fn is_generated(path: &Path) -> bool {
    std::fs::read_to_string(path).is_ok_and(|c| c.starts_with(GENERATED_MARKER))
}

fn chattr(flag: &str, path: &Path) -> SystemCommand {
    SystemCommand::new("chattr")
        .arg(flag)
        .arg(path.display().to_string())
}

/// Flushes systemd-resolved and restarts nscd, both best-effort.
async fn flush_caches(ctx: &OpContext<'_>) {
    narrate!(ctx.verbose(), "Flushing DNS caches");
    let mut tasks = BestEffort::new();
    ctx.spawn_first_success(
        &mut tasks,
        "flush-resolved",
        vec![
            SystemCommand::new("resolvectl").arg("flush-caches"),
            SystemCommand::new("systemd-resolve").arg("--flush-caches"),
        ],
    );
    ctx.spawn_if(
        &mut tasks,
        "restart-nscd",
        SystemCommand::new("systemctl").args(["is-active", "--quiet", "nscd"]),
        SystemCommand::new("service").args(["nscd", "restart"]),
    );
    tasks.drain().await;
}
