//! # dns-changer
//!
//! Point the host's DNS configuration at a pair of servers, and put the
//! previous configuration back later.
//!
//! Each platform gets its own mechanism behind one contract:
//!
//! | Platform | Apply | Restore |
//! |----------|-------|---------|
//! | Linux    | rewrite `/etc/resolv.conf`, `chattr +i` | copy the saved file back |
//! | macOS    | `networksetup -setdnsservers` per service | DHCP (`Empty`) or the captured pair |
//! | Windows  | `netsh` or `Set-DnsClientServerAddress` per adapter | DHCP |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dns_changer::{ChangerOptions, DnsChanger, DnsServerList};
//!
//! let changer = DnsChanger::detect().await;
//! let servers: DnsServerList = "1.1.1.1 1.0.0.1".parse()?;
//!
//! // Apply (requires root / administrator; macOS prompts).
//! let outcome = changer.apply(&servers, &ChangerOptions::default()).await?;
//! for failure in &outcome.report().unwrap().failed {
//!     eprintln!("{}: {}", failure.interface, failure.reason);
//! }
//!
//! // Put things back.
//! changer.restore(&ChangerOptions::default()).await?;
//! ```
//!
//! ## Backups
//!
//! Apply snapshots the current configuration under
//! [`ChangerOptions::backup_name`] unless told not to. Restore with the same
//! name reads it back. Only one backup per name is kept; a second snapshot
//! replaces the first.
//!
//! ## Concurrency
//!
//! Interfaces are configured concurrently within one call. Separate calls
//! are not serialized: do not run apply and restore at the same time for the
//! same backup name.
//!
//! ## Permissions
//!
//! Linux requires an effective uid of 0 and Windows an elevated process;
//! otherwise calls fail with [`ChangerError::Permission`] before anything is
//! touched. On macOS an unprivileged process gets a single administrator
//! prompt per call.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

/// Emits an `info` event only when narration is enabled for this call.
macro_rules! narrate {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::info!($($arg)+);
        }
    };
}

pub mod address;
pub mod backup;
pub mod changer;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod interfaces;
pub mod outcome;
pub mod platform;
pub mod privilege;
pub mod strategy;
pub mod util;

pub use address::{DnsServer, DnsServerList, ServersInput};
pub use backup::{BackupStore, RestoreTarget};
pub use changer::DnsChanger;
pub use command::{CommandOutput, CommandRunner, SystemCommand, SystemRunner};
pub use config::{ChangerOptions, DEFAULT_BACKUP_NAME, Paths};
pub use error::{ChangerError, Result};
pub use interfaces::{InterfaceList, NetworkInterfaceRef};
pub use outcome::{InterfaceFailure, Outcome, Report};
pub use platform::{OsVersion, Platform, WindowsTool};
pub use privilege::{Elevation, FixedPrivilege, PrivilegeGuard, SystemPrivilegeGuard};
pub use strategy::PlatformStrategy;
