//! Snapshots of the DNS configuration taken before a change.
//!
//! One artifact per backup name and platform:
//!
//! | Platform | Artifact |
//! |----------|----------|
//! | Linux    | `/etc/resolv.conf.<name>`, a full copy |
//! | macOS    | `/Library/Caches/<name>.txt`, two addresses, one per line |
//! | Windows  | none; restore hands adapters back to DHCP |
//!
//! Artifacts belong to the system, not to this process. They may vanish
//! between calls and every operation here tolerates that.

use crate::address::DnsServerList;
use crate::command::SystemCommand;
use crate::config::Paths;
use crate::context::OpContext;
use crate::error::{ChangerError, Result};
use crate::platform::Platform;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// What a restore should put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreTarget {
    /// Hand every interface back to DHCP.
    Dhcp,
    /// Replay a captured server pair.
    Servers(DnsServerList),
    /// Copy this saved resolver file back into place.
    ResolverFile(PathBuf),
}

/// Reads and writes backup artifacts under a [`Paths`] layout.
pub struct BackupStore<'a> {
    paths: &'a Paths,
}

impl<'a> BackupStore<'a> {
    /// Creates a store rooted at `paths`.
    #[must_use]
    pub const fn new(paths: &'a Paths) -> Self {
        Self { paths }
    }

    /// Where the artifact for `name` lives, if the platform keeps one.
    #[must_use]
    pub fn artifact_path(&self, platform: Platform, name: &str) -> Option<PathBuf> {
        match platform {
            Platform::Linux => Some(self.paths.linux_backup(name)),
            Platform::MacOs => Some(self.paths.macos_backup(name)),
            Platform::Windows(_) | Platform::Unsupported => None,
        }
    }

    /// Returns `true` if an artifact for `name` exists.
    #[must_use]
    pub fn exists(&self, platform: Platform, name: &str) -> bool {
        self.artifact_path(platform, name)
            .is_some_and(|path| path.is_file())
    }

    /// Captures the current configuration under `ctx.options.backup_name`,
    /// replacing any earlier artifact of the same name.
    ///
    /// Returns the artifact path, or `None` on Windows where nothing is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Io`] if the copy or write fails, or
    /// [`ChangerError::Backup`] if macOS reports no active nameserver.
    pub async fn snapshot(&self, platform: Platform, ctx: &OpContext<'_>) -> Result<Option<PathBuf>> {
        let name = ctx.options.backup_name.as_str();
        match platform {
            Platform::Linux => {
                let target = self.paths.linux_backup(name);
                std::fs::copy(self.paths.resolv_conf(), &target)?;
                narrate!(ctx.verbose(), path = %target.display(), "Backed up resolver file");
                Ok(Some(target))
            }
            Platform::MacOs => {
                let (first, second) = self.capture_servers(ctx).await?;
                let target = self.save_servers(name, &first, &second)?;
                narrate!(
                    ctx.verbose(),
                    path = %target.display(),
                    primary = %first,
                    secondary = %second,
                    "Backed up active nameservers"
                );
                Ok(Some(target))
            }
            Platform::Windows(_) | Platform::Unsupported => {
                narrate!(ctx.verbose(), "No backup kept on this platform");
                Ok(None)
            }
        }
    }

    /// Reads the active macOS nameservers without writing anything.
    ///
    /// A single nameserver is returned as both entries.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Command`] if `scutil` fails, or
    /// [`ChangerError::Backup`] if it reports no active nameserver.
    pub async fn capture_servers(&self, ctx: &OpContext<'_>) -> Result<(String, String)> {
        let output = ctx.run_checked(&scutil_dns_command()).await?;
        match parse_scutil_nameservers(&output.stdout).as_slice() {
            [] => Err(ChangerError::Backup(
                "scutil reported no active nameserver to back up".into(),
            )),
            [only] => Ok((only.clone(), only.clone())),
            [first, second, ..] => Ok((first.clone(), second.clone())),
        }
    }

    /// Writes a captured macOS pair as the artifact for `name`, replacing
    /// any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Io`] if the directory or file cannot be
    /// written.
    pub fn save_servers(&self, name: &str, first: &str, second: &str) -> Result<PathBuf> {
        let target = self.paths.macos_backup(name);
        write_macos_artifact(&target, first, second)?;
        Ok(target)
    }

    /// Loads what a restore of `name` should apply.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::NotFound`] if the artifact is missing, or
    /// [`ChangerError::Backup`] if a macOS artifact is malformed.
    pub fn load(&self, platform: Platform, name: &str) -> Result<RestoreTarget> {
        match platform {
            Platform::Linux => {
                let path = self.paths.linux_backup(name);
                if path.is_file() {
                    Ok(RestoreTarget::ResolverFile(path))
                } else {
                    Err(not_found(&path))
                }
            }
            Platform::MacOs => self.load_servers(name).map(RestoreTarget::Servers),
            Platform::Windows(_) | Platform::Unsupported => Ok(RestoreTarget::Dhcp),
        }
    }

    /// Reads the two-line macOS artifact for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::NotFound`] if the artifact is missing, or
    /// [`ChangerError::Backup`] if it does not hold exactly two addresses.
    pub fn load_servers(&self, name: &str) -> Result<DnsServerList> {
        let path = self.paths.macos_backup(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(&path)),
            Err(e) => return Err(e.into()),
        };
        parse_macos_artifact(&content)
            .map_err(|e| ChangerError::Backup(format!("{} is malformed: {e}", path.display())))
    }

    /// Deletes the artifact for `name`. A missing artifact is success.
    ///
    /// Returns `true` if a file was removed.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Io`] if the file exists but cannot be removed.
    pub fn remove(&self, platform: Platform, name: &str) -> Result<bool> {
        let Some(path) = self.artifact_path(platform, name) else {
            return Ok(false);
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn not_found(path: &Path) -> ChangerError {
    ChangerError::NotFound {
        path: path.display().to_string(),
    }
}

/// `scutil --dns`.
#[must_use]
pub fn scutil_dns_command() -> SystemCommand {
    SystemCommand::new("scutil").arg("--dns")
}

/// Extracts `nameserver[N] : <address>` values in order of appearance.
#[must_use]
pub fn parse_scutil_nameservers(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("nameserver[")?;
            let (index, value) = rest.split_once(']')?;
            if !index.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let value = value.trim_start().strip_prefix(':')?.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect()
}

fn write_macos_artifact(path: &Path, first: &str, second: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    std::fs::write(path, format!("{first}\n{second}\n"))?;
    Ok(())
}

fn parse_macos_artifact(content: &str) -> Result<DnsServerList> {
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    DnsServerList::parse(lines)
}
