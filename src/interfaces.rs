//! Network interface enumeration.
//!
//! Interfaces are listed fresh on every call; adapters and services come
//! and go between calls.

use crate::command::SystemCommand;
use crate::context::OpContext;
use crate::error::Result;
use crate::platform::Platform;
use std::fmt;

/// macOS services that are never touched.
pub const MACOS_IGNORED_SERVICES: [&str; 5] =
    ["iPhone USB", "Bluetooth PAN", "Thunderbolt Bridge", "lo0", ""];

/// Pseudo interface name used for the Linux resolver file.
pub const WHOLE_MACHINE: &str = "resolv.conf";

/// A platform-native handle on something that carries DNS settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetworkInterfaceRef {
    /// Linux: the resolver file is global, there is nothing finer.
    WholeMachine,
    /// macOS network service name (`Wi-Fi`, `Ethernet`, ...).
    Service(String),
    /// Windows adapter alias.
    Adapter(String),
}

impl NetworkInterfaceRef {
    /// The name used on command lines.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::WholeMachine => WHOLE_MACHINE,
            Self::Service(name) | Self::Adapter(name) => name,
        }
    }
}

impl fmt::Display for NetworkInterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Interfaces split into those to configure and those the ignore-set
/// excludes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceList {
    /// Interfaces to configure.
    pub targets: Vec<NetworkInterfaceRef>,
    /// Names skipped by the ignore-set.
    pub ignored: Vec<String>,
}

/// `networksetup -listallnetworkservices`.
#[must_use]
pub fn macos_list_command() -> SystemCommand {
    SystemCommand::new("networksetup").arg("-listallnetworkservices")
}

/// `netsh interface show interface`.
#[must_use]
pub fn windows_list_command() -> SystemCommand {
    SystemCommand::new("netsh").args(["interface", "show", "interface"])
}

/// Parses `networksetup -listallnetworkservices`.
///
/// The first line is a legend about disabled services; disabled services
/// carry a leading `*`, which is stripped so the name works with
/// `-setdnsservers`.
#[must_use]
pub fn parse_macos_services(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(|line| {
            let line = line.trim_end_matches('\r');
            line.strip_prefix('*').unwrap_or(line).to_string()
        })
        .collect()
}

/// Parses `netsh interface show interface`: every row after the dashed
/// separator, name taken from the fourth column to the end of the line.
#[must_use]
pub fn parse_netsh_interfaces(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut rest = line.trim();
            for _ in 0..3 {
                rest = rest.split_once(char::is_whitespace)?.1.trim_start();
            }
            (!rest.is_empty()).then(|| rest.to_string())
        })
        .collect()
}

/// Splits macOS services into targets and ignored names.
#[must_use]
pub fn filter_macos_services(services: Vec<String>) -> InterfaceList {
    let mut list = InterfaceList::default();
    for service in services {
        if MACOS_IGNORED_SERVICES.contains(&service.as_str()) {
            list.ignored.push(service);
        } else {
            list.targets.push(NetworkInterfaceRef::Service(service));
        }
    }
    list
}

/// Lists the interfaces to configure on `platform`.
///
/// # Errors
///
/// Returns [`ChangerError::Command`](crate::ChangerError::Command) if the
/// listing command fails.
pub async fn list_interfaces(platform: Platform, ctx: &OpContext<'_>) -> Result<InterfaceList> {
    let list = match platform {
        Platform::Linux => InterfaceList {
            targets: vec![NetworkInterfaceRef::WholeMachine],
            ignored: Vec::new(),
        },
        Platform::MacOs => {
            let output = ctx.run_checked(&macos_list_command()).await?;
            let list = filter_macos_services(parse_macos_services(&output.stdout));
            for name in &list.ignored {
                narrate!(ctx.verbose(), interface = %name, "Ignoring interface");
            }
            list
        }
        Platform::Windows(_) => {
            let output = ctx.run_checked(&windows_list_command()).await?;
            InterfaceList {
                targets: parse_netsh_interfaces(&output.stdout)
                    .into_iter()
                    .map(NetworkInterfaceRef::Adapter)
                    .collect(),
                ignored: Vec::new(),
            }
        }
        Platform::Unsupported => InterfaceList::default(),
    };
    if ctx.verbose() {
        let names: Vec<&str> = list.targets.iter().map(NetworkInterfaceRef::name).collect();
        tracing::info!(platform = %platform, interfaces = ?names, "Enumerated interfaces");
    }
    Ok(list)
}
