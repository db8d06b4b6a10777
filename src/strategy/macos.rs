//! macOS: `networksetup -setdnsservers` on every network service.

use super::PlatformStrategy;
use crate::address::DnsServerList;
use crate::backup::BackupStore;
use crate::command::{BestEffort, SystemCommand};
use crate::context::{InterfaceJob, OpContext};
use crate::error::Result;
use crate::interfaces::InterfaceList;
use crate::outcome::Outcome;
use crate::platform::Platform;
use crate::privilege::Elevation;
use async_trait::async_trait;

/// `networksetup` argument that hands a service back to DHCP.
pub const DHCP_SENTINEL: &str = "Empty";

/// Network-service strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacNetworkSetup;

#[async_trait]
impl PlatformStrategy for MacNetworkSetup {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    async fn apply(&self, servers: &DnsServerList, ctx: &OpContext<'_>) -> Result<Outcome> {
        let elevation = ctx
            .guard
            .ensure_elevated(Platform::MacOs, ctx.runner.as_ref())
            .await?;
        let interfaces = self.list_interfaces(ctx).await?;
        let store = BackupStore::new(ctx.paths);

        // Captured now, written only once the change went through: a
        // dismissed prompt must leave an earlier backup untouched.
        let captured = if ctx.options.make_backup {
            narrate!(ctx.verbose(), "Reading current DNS servers");
            Some(store.capture_servers(ctx).await?)
        } else {
            None
        };

        let outcome = configure(ctx, elevation, interfaces, &servers.to_vec()).await?;

        if let Some((first, second)) = captured {
            let path = store.save_servers(&ctx.options.backup_name, &first, &second)?;
            narrate!(
                ctx.verbose(),
                path = %path.display(),
                primary = %first,
                secondary = %second,
                "Backed up previous nameservers"
            );
        }
        narrate!(ctx.verbose(), servers = %servers, "DNS servers set");
        Ok(outcome)
    }

    async fn restore(&self, ctx: &OpContext<'_>) -> Result<Outcome> {
        let name = ctx.options.backup_name.as_str();
        let store = BackupStore::new(ctx.paths);

        let target = if ctx.options.use_dhcp_on_restore {
            narrate!(ctx.verbose(), "Restoring DNS servers from DHCP");
            vec![DHCP_SENTINEL.to_string()]
        } else {
            match store.load_servers(name) {
                Ok(servers) => {
                    narrate!(ctx.verbose(), servers = %servers, "Found backed up DNS servers");
                    servers.to_vec()
                }
                Err(e) if e.is_not_found() => {
                    narrate!(ctx.verbose(), error = %e, "No backup found, nothing to restore");
                    return Ok(Outcome::skipped(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        };

        let elevation = ctx
            .guard
            .ensure_elevated(Platform::MacOs, ctx.runner.as_ref())
            .await?;
        let interfaces = self.list_interfaces(ctx).await?;
        let outcome = configure(ctx, elevation, interfaces, &target).await?;

        if ctx.options.remove_backup && store.remove(Platform::MacOs, name)? {
            narrate!(ctx.verbose(), backup = name, "Removed backup");
        }
        narrate!(ctx.verbose(), "DNS servers restored");
        Ok(outcome)
    }
}

/// `networksetup -setdnsservers <service> <values...>`.
#[must_use]
pub fn set_dns_servers(service: &str, values: &[String]) -> SystemCommand {
    SystemCommand::new("networksetup")
        .arg("-setdnsservers")
        .arg(service)
        .args(values.iter().cloned())
}

async fn configure(
    ctx: &OpContext<'_>,
    elevation: Elevation,
    interfaces: InterfaceList,
    values: &[String],
) -> Result<Outcome> {
    let jobs = interfaces
        .targets
        .iter()
        .map(|iface| InterfaceJob {
            interface: iface.name().to_string(),
            commands: vec![set_dns_servers(iface.name(), values)],
        })
        .collect();
    let mut report = ctx.fan_out(elevation, jobs).await?;
    report.ignored = interfaces.ignored;

    if elevation == Elevation::Direct {
        narrate!(ctx.verbose(), "Flushing DNS cache");
        let mut tasks = BestEffort::new();
        ctx.spawn_first_success(
            &mut tasks,
            "flush-dscache",
            vec![SystemCommand::new("dscacheutil").arg("-flushcache")],
        );
        ctx.spawn_first_success(
            &mut tasks,
            "reload-mdnsresponder",
            vec![SystemCommand::new("killall").args(["-HUP", "mDNSResponder"])],
        );
        tasks.drain().await;
    } else {
        narrate!(ctx.verbose(), "Skipping cache flush without root");
    }
    Ok(Outcome::Succeeded(report))
}
