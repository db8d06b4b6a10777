//! The apply/restore entry points.

use crate::address::DnsServerList;
use crate::command::{CommandRunner, SystemRunner};
use crate::config::{ChangerOptions, Paths};
use crate::context::OpContext;
use crate::error::{ChangerError, Result};
use crate::interfaces::InterfaceList;
use crate::outcome::Outcome;
use crate::platform::Platform;
use crate::privilege::{PrivilegeGuard, SystemPrivilegeGuard};
use crate::strategy::{PlatformStrategy, for_platform};
use std::sync::Arc;

/// Changes and restores the host's DNS servers.
///
/// The platform strategy is fixed when the changer is built. Calls do not
/// lock against each other; running [`apply`](Self::apply) and
/// [`restore`](Self::restore) concurrently for the same backup name races
/// on the backup artifact and the resolver file.
///
/// # Example
///
/// ```rust,ignore
/// use dns_changer::{ChangerOptions, DnsChanger, DnsServerList};
///
/// let changer = DnsChanger::detect().await;
/// let servers = DnsServerList::parse(["9.9.9.9", "149.112.112.112"])?;
/// let options = ChangerOptions::default().with_backup_name("vpn");
///
/// changer.apply(&servers, &options).await?;
/// // ...
/// changer.restore(&options.with_remove_backup(true)).await?;
/// ```
pub struct DnsChanger {
    strategy: Box<dyn PlatformStrategy>,
    runner: Arc<dyn CommandRunner>,
    guard: Arc<dyn PrivilegeGuard>,
    paths: Paths,
}

impl DnsChanger {
    /// Detects the host platform and uses the real system.
    pub async fn detect() -> Self {
        let platform = Platform::detect(&SystemRunner).await;
        Self::new(platform)
    }

    /// Uses the real system with an explicit platform.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            strategy: for_platform(platform),
            runner: Arc::new(SystemRunner),
            guard: Arc::new(SystemPrivilegeGuard),
            paths: Paths::system(),
        }
    }

    /// Replaces the command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replaces the privilege guard.
    #[must_use]
    pub fn with_guard(mut self, guard: Arc<dyn PrivilegeGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Replaces the filesystem layout (useful for testing).
    #[must_use]
    pub fn with_paths(mut self, paths: Paths) -> Self {
        self.paths = paths;
        self
    }

    /// The platform chosen at construction.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.strategy.platform()
    }

    /// The filesystem layout in use.
    #[must_use]
    pub const fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Points the host at `servers`.
    ///
    /// Returns [`Outcome::Succeeded`] with a per-interface report, or
    /// [`Outcome::Skipped`] on an unsupported platform.
    ///
    /// # Errors
    ///
    /// - [`ChangerError::Validation`] for bad options, before anything runs.
    /// - [`ChangerError::Permission`] / [`ChangerError::ElevationTimeout`]
    ///   before any mutation.
    /// - [`ChangerError::Command`], [`ChangerError::Io`],
    ///   [`ChangerError::Backup`] when a required step fails.
    /// - [`ChangerError::Interfaces`] when
    ///   [`ChangerOptions::require_all_interfaces`] is set and an interface
    ///   failed.
    pub async fn apply(&self, servers: &DnsServerList, options: &ChangerOptions) -> Result<Outcome> {
        options.validate()?;
        let ctx = self.context(options);
        narrate!(
            ctx.verbose(),
            servers = %servers,
            platform = %self.platform(),
            backup = %options.backup_name,
            make_backup = options.make_backup,
            "Setting DNS servers"
        );
        let outcome = self.strategy.apply(servers, &ctx).await?;
        enforce_strict(outcome, options)
    }

    /// Puts back the configuration saved under `options.backup_name`.
    ///
    /// Returns [`Outcome::Skipped`] when there is nothing to restore or the
    /// platform is unsupported.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub async fn restore(&self, options: &ChangerOptions) -> Result<Outcome> {
        options.validate()?;
        let ctx = self.context(options);
        narrate!(
            ctx.verbose(),
            platform = %self.platform(),
            backup = %options.backup_name,
            remove_backup = options.remove_backup,
            "Restoring DNS servers"
        );
        let outcome = self.strategy.restore(&ctx).await?;
        enforce_strict(outcome, options)
    }

    /// Lists the interfaces an operation would touch, without changing
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Command`] if the listing command fails.
    pub async fn list_interfaces(&self, options: &ChangerOptions) -> Result<InterfaceList> {
        options.validate()?;
        let ctx = self.context(options);
        self.strategy.list_interfaces(&ctx).await
    }

    fn context<'a>(&'a self, options: &'a ChangerOptions) -> OpContext<'a> {
        OpContext {
            runner: Arc::clone(&self.runner),
            guard: self.guard.as_ref(),
            options,
            paths: &self.paths,
        }
    }
}

fn enforce_strict(outcome: Outcome, options: &ChangerOptions) -> Result<Outcome> {
    match outcome {
        Outcome::Succeeded(report) if options.require_all_interfaces && !report.is_clean() => {
            Err(ChangerError::Interfaces(report.failed))
        }
        other => Ok(other),
    }
}
