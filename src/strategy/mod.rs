//! One configuration strategy per platform.
//!
//! The strategy is chosen once, when a [`DnsChanger`](crate::DnsChanger) is
//! built. Platform quirks (ignore-sets, tool selection, which platforms keep
//! backups) stay inside the implementations.

use crate::address::DnsServerList;
use crate::backup::BackupStore;
use crate::context::OpContext;
use crate::error::Result;
use crate::interfaces::{InterfaceList, list_interfaces};
use crate::outcome::Outcome;
use crate::platform::Platform;
use async_trait::async_trait;
use std::path::PathBuf;

pub mod linux;
pub mod macos;
pub mod unsupported;
pub mod windows;

pub use linux::LinuxResolvConf;
pub use macos::MacNetworkSetup;
pub use unsupported::Unsupported;
pub use windows::WindowsAdapters;

/// Platform-specific apply/restore.
#[async_trait]
pub trait PlatformStrategy: Send + Sync {
    /// The platform this strategy drives.
    fn platform(&self) -> Platform;

    /// Lists the interfaces an operation would touch.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Command`](crate::ChangerError::Command) if the
    /// listing command fails.
    async fn list_interfaces(&self, ctx: &OpContext<'_>) -> Result<InterfaceList> {
        list_interfaces(self.platform(), ctx).await
    }

    /// Captures the current configuration under the call's backup name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup cannot be taken.
    async fn snapshot(&self, ctx: &OpContext<'_>) -> Result<Option<PathBuf>> {
        BackupStore::new(ctx.paths)
            .snapshot(self.platform(), ctx)
            .await
    }

    /// Points the host at `servers`.
    ///
    /// # Errors
    ///
    /// Returns an error on permission, I/O or mutating command failure.
    async fn apply(&self, servers: &DnsServerList, ctx: &OpContext<'_>) -> Result<Outcome>;

    /// Puts back the configuration saved under the call's backup name.
    ///
    /// # Errors
    ///
    /// Returns an error on permission, I/O or mutating command failure.
    async fn restore(&self, ctx: &OpContext<'_>) -> Result<Outcome>;
}

/// Builds the strategy for `platform`.
#[must_use]
pub fn for_platform(platform: Platform) -> Box<dyn PlatformStrategy> {
    match platform {
        Platform::Linux => Box::new(LinuxResolvConf),
        Platform::MacOs => Box::new(MacNetworkSetup),
        Platform::Windows(tool) => Box::new(WindowsAdapters::new(tool)),
        Platform::Unsupported => Box::new(Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::WindowsTool;

    #[test]
    fn strategy_matches_platform() {
        for platform in [
            Platform::Linux,
            Platform::MacOs,
            Platform::Windows(WindowsTool::Netsh),
            Platform::Windows(WindowsTool::PowerShell),
            Platform::Unsupported,
        ] {
            assert_eq!(for_platform(platform).platform(), platform);
        }
    }
}
