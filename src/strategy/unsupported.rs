//! Platforms without a DNS mechanism: every operation is skipped.

use super::PlatformStrategy;
use crate::address::DnsServerList;
use crate::context::OpContext;
use crate::error::Result;
use crate::interfaces::InterfaceList;
use crate::outcome::Outcome;
use crate::platform::Platform;
use async_trait::async_trait;

/// Runs no command and reports [`Outcome::Skipped`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

const REASON: &str = "unsupported platform";

#[async_trait]
impl PlatformStrategy for Unsupported {
    fn platform(&self) -> Platform {
        Platform::Unsupported
    }

    async fn list_interfaces(&self, _ctx: &OpContext<'_>) -> Result<InterfaceList> {
        Ok(InterfaceList::default())
    }

    async fn apply(&self, _servers: &DnsServerList, ctx: &OpContext<'_>) -> Result<Outcome> {
        tracing::warn!(os = std::env::consts::OS, "Unsupported platform, not setting DNS");
        narrate!(ctx.verbose(), "Nothing changed");
        Ok(Outcome::skipped(REASON))
    }

    async fn restore(&self, ctx: &OpContext<'_>) -> Result<Outcome> {
        tracing::warn!(os = std::env::consts::OS, "Unsupported platform, not restoring DNS");
        narrate!(ctx.verbose(), "Nothing changed");
        Ok(Outcome::skipped(REASON))
    }
}
