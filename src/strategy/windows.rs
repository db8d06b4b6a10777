//! Windows: per-adapter `netsh` or PowerShell.
//!
//! Windows keeps no backup. Restore always hands adapters back to DHCP.

use super::PlatformStrategy;
use crate::address::{DnsServer, DnsServerList};
use crate::command::{BestEffort, SystemCommand};
use crate::context::{InterfaceJob, OpContext};
use crate::error::Result;
use crate::outcome::Outcome;
use crate::platform::{Platform, WindowsTool};
use crate::util::powershell_quote;
use async_trait::async_trait;

const POWERSHELL_ARGS: [&str; 3] = ["-NoProfile", "-NonInteractive", "-Command"];

/// Adapter strategy with the tool detected at startup.
#[derive(Debug, Clone, Copy)]
pub struct WindowsAdapters {
    detected: WindowsTool,
}

impl WindowsAdapters {
    /// Creates the strategy around the detected tool.
    #[must_use]
    pub const fn new(detected: WindowsTool) -> Self {
        Self { detected }
    }

    /// The tool for one call: `netsh` when the caller prefers it, otherwise
    /// the detected one.
    #[must_use]
    pub const fn tool(&self, prefer_legacy: bool) -> WindowsTool {
        if prefer_legacy {
            WindowsTool::Netsh
        } else {
            self.detected
        }
    }

    async fn run_jobs(
        &self,
        ctx: &OpContext<'_>,
        build: impl Fn(WindowsTool, &str) -> Vec<SystemCommand> + Send + Sync,
    ) -> Result<Outcome> {
        // Awaited before anything is listed or changed.
        let elevation = ctx
            .guard
            .ensure_elevated(self.platform(), ctx.runner.as_ref())
            .await?;
        let tool = self.tool(ctx.options.prefer_legacy_windows_tool);
        narrate!(ctx.verbose(), tool = ?tool, "Using Windows DNS tool");

        let interfaces = self.list_interfaces(ctx).await?;
        let jobs = interfaces
            .targets
            .iter()
            .map(|iface| InterfaceJob {
                interface: iface.name().to_string(),
                commands: build(tool, iface.name()),
            })
            .collect();
        let report = ctx.fan_out(elevation, jobs).await?;

        narrate!(ctx.verbose(), "Flushing DNS cache");
        let mut tasks = BestEffort::new();
        ctx.spawn_first_success(
            &mut tasks,
            "flush-dns",
            vec![SystemCommand::new("ipconfig").arg("/flushdns")],
        );
        tasks.drain().await;
        Ok(Outcome::Succeeded(report))
    }
}

#[async_trait]
impl PlatformStrategy for WindowsAdapters {
    fn platform(&self) -> Platform {
        Platform::Windows(self.detected)
    }

    async fn apply(&self, servers: &DnsServerList, ctx: &OpContext<'_>) -> Result<Outcome> {
        if ctx.options.make_backup {
            self.snapshot(ctx).await?;
        }
        let outcome = self
            .run_jobs(ctx, |tool, name| set_commands(tool, name, servers))
            .await?;
        narrate!(ctx.verbose(), servers = %servers, "DNS servers set");
        Ok(outcome)
    }

    async fn restore(&self, ctx: &OpContext<'_>) -> Result<Outcome> {
        narrate!(ctx.verbose(), "Restoring DNS servers from DHCP");
        let outcome = self.run_jobs(ctx, reset_commands).await?;
        narrate!(ctx.verbose(), "DNS servers restored");
        Ok(outcome)
    }
}

/// Commands that point `interface` at `servers`.
///
/// `netsh` needs two steps (primary, then secondary at index 2) in the
/// `ipv4` or `ipv6` context matching the addresses; the second is skipped
/// if the first fails. A mixed pair sets each address as the primary of
/// its own context.
#[must_use]
pub fn set_commands(tool: WindowsTool, interface: &str, servers: &DnsServerList) -> Vec<SystemCommand> {
    match tool {
        WindowsTool::Netsh => {
            let (primary, secondary) = (servers.primary(), servers.secondary());
            let first = netsh_set_primary(interface, primary);
            if primary.is_ipv6() == secondary.is_ipv6() {
                vec![
                    first,
                    SystemCommand::new("netsh").args([
                        "interface".to_string(),
                        netsh_context(secondary).to_string(),
                        "add".to_string(),
                        "dns".to_string(),
                        format!("name={interface}"),
                        secondary.to_string(),
                        "index=2".to_string(),
                    ]),
                ]
            } else {
                vec![first, netsh_set_primary(interface, secondary)]
            }
        }
        WindowsTool::PowerShell => vec![powershell(&format!(
            "Set-DnsClientServerAddress -InterfaceAlias {} -ServerAddresses ({},{})",
            powershell_quote(interface),
            powershell_quote(servers.primary().as_str()),
            powershell_quote(servers.secondary().as_str()),
        ))],
    }
}

fn netsh_context(server: &DnsServer) -> &'static str {
    if server.is_ipv6() { "ipv6" } else { "ipv4" }
}

fn netsh_set_primary(interface: &str, server: &DnsServer) -> SystemCommand {
    SystemCommand::new("netsh").args([
        "interface".to_string(),
        netsh_context(server).to_string(),
        "set".to_string(),
        "dns".to_string(),
        format!("name={interface}"),
        "static".to_string(),
        server.to_string(),
        "primary".to_string(),
    ])
}

/// Commands that hand `interface` back to DHCP.
#[must_use]
pub fn reset_commands(tool: WindowsTool, interface: &str) -> Vec<SystemCommand> {
    match tool {
        WindowsTool::Netsh => vec![SystemCommand::new("netsh").args([
            "interface".to_string(),
            "ipv4".to_string(),
            "set".to_string(),
            "dns".to_string(),
            format!("name={interface}"),
            "dhcp".to_string(),
        ])],
        WindowsTool::PowerShell => vec![powershell(&format!(
            "Set-DnsClientServerAddress -InterfaceAlias {} -ResetServerAddresses",
            powershell_quote(interface),
        ))],
    }
}

fn powershell(script: &str) -> SystemCommand {
    SystemCommand::new("powershell")
        .args(POWERSHELL_ARGS)
        .arg(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servers() -> DnsServerList {
        DnsServerList::parse(["1.1.1.1", "1.0.0.1"]).unwrap()
    }

    #[test]
    fn netsh_sets_primary_then_adds_secondary() {
        let cmds = set_commands(WindowsTool::Netsh, "Wi-Fi 2", &servers());
        assert_eq!(cmds.len(), 2);
        assert_eq!(
            cmds[0].to_string(),
            "netsh interface ipv4 set dns \"name=Wi-Fi 2\" static 1.1.1.1 primary"
        );
        assert_eq!(
            cmds[1].to_string(),
            "netsh interface ipv4 add dns \"name=Wi-Fi 2\" 1.0.0.1 index=2"
        );
    }

    #[test]
    fn netsh_uses_ipv6_context_for_ipv6_servers() {
        let v6 = DnsServerList::parse(["2606:4700:4700::1111", "2606:4700:4700::1001"]).unwrap();
        let cmds = set_commands(WindowsTool::Netsh, "Ethernet", &v6);
        assert_eq!(
            cmds[0].to_string(),
            "netsh interface ipv6 set dns name=Ethernet static 2606:4700:4700::1111 primary"
        );
        assert_eq!(
            cmds[1].to_string(),
            "netsh interface ipv6 add dns name=Ethernet 2606:4700:4700::1001 index=2"
        );
    }

    #[test]
    fn netsh_mixed_pair_sets_each_family_as_primary() {
        let mixed = DnsServerList::parse(["1.1.1.1", "2606:4700:4700::1111"]).unwrap();
        let cmds = set_commands(WindowsTool::Netsh, "Ethernet", &mixed);
        assert_eq!(cmds.len(), 2);
        assert_eq!(
            cmds[0].to_string(),
            "netsh interface ipv4 set dns name=Ethernet static 1.1.1.1 primary"
        );
        assert_eq!(
            cmds[1].to_string(),
            "netsh interface ipv6 set dns name=Ethernet static 2606:4700:4700::1111 primary"
        );
    }

    #[test]
    fn powershell_sets_both_in_one_command() {
        let cmds = set_commands(WindowsTool::PowerShell, "Ethernet", &servers());
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].program, "powershell");
        assert_eq!(
            cmds[0].args.last().unwrap(),
            "Set-DnsClientServerAddress -InterfaceAlias 'Ethernet' -ServerAddresses ('1.1.1.1','1.0.0.1')"
        );
    }

    #[test]
    fn reset_commands_per_tool() {
        assert_eq!(
            reset_commands(WindowsTool::Netsh, "Ethernet")[0].to_string(),
            "netsh interface ipv4 set dns name=Ethernet dhcp"
        );
        assert_eq!(
            reset_commands(WindowsTool::PowerShell, "Bob's NIC")[0]
                .args
                .last()
                .unwrap(),
            "Set-DnsClientServerAddress -InterfaceAlias 'Bob''s NIC' -ResetServerAddresses"
        );
    }

    #[test]
    fn prefer_legacy_overrides_detected_tool() {
        let strategy = WindowsAdapters::new(WindowsTool::PowerShell);
        assert_eq!(strategy.tool(false), WindowsTool::PowerShell);
        assert_eq!(strategy.tool(true), WindowsTool::Netsh);
    }
}
