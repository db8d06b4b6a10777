//! Operation options and on-disk locations.

use crate::error::{ChangerError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backup name used when the caller does not pick one.
pub const DEFAULT_BACKUP_NAME: &str = "before-dns-changer";

/// Default bound on how long an admin prompt may stay unanswered.
pub const DEFAULT_ELEVATION_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_BACKUP_NAME_LEN: usize = 128;

/// Options for a single apply or restore call.
///
/// Fields that only one of the two operations reads are ignored by the
/// other (`make_backup` is apply-only, `remove_backup` and
/// `use_dhcp_on_restore` are restore-only).
///
/// # Example
///
/// ```
/// use dns_changer::ChangerOptions;
///
/// let options = ChangerOptions::default()
///     .with_backup_name("office")
///     .with_remove_backup(true);
///
/// assert_eq!(options.backup_name, "office");
/// assert!(options.make_backup);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangerOptions {
    /// Identifies the backup artifact shared by apply and restore.
    pub backup_name: String,

    /// Snapshot the current configuration before applying.
    pub make_backup: bool,

    /// Delete the snapshot after a successful restore.
    pub remove_backup: bool,

    /// Use `netsh` on Windows regardless of the detected version.
    pub prefer_legacy_windows_tool: bool,

    /// macOS: restore by handing interfaces back to DHCP instead of
    /// replaying the captured servers.
    pub use_dhcp_on_restore: bool,

    /// Narrate decisions and commands through `tracing`. Does not change
    /// control flow.
    pub logging_enabled: bool,

    /// Linux: toggle the resolver file's immutable attribute around writes.
    pub lock_resolver: bool,

    /// Turn any per-interface failure into an error once the fan-out ends.
    pub require_all_interfaces: bool,

    /// Upper bound on waiting for an admin prompt.
    pub elevation_timeout: Duration,
}

impl Default for ChangerOptions {
    fn default() -> Self {
        Self {
            backup_name: DEFAULT_BACKUP_NAME.to_string(),
            make_backup: true,
            remove_backup: false,
            prefer_legacy_windows_tool: false,
            use_dhcp_on_restore: true,
            logging_enabled: true,
            lock_resolver: true,
            require_all_interfaces: false,
            elevation_timeout: DEFAULT_ELEVATION_TIMEOUT,
        }
    }
}

impl ChangerOptions {
    /// Overrides the backup name.
    #[must_use]
    pub fn with_backup_name(mut self, name: impl Into<String>) -> Self {
        self.backup_name = name.into();
        self
    }

    /// Enables or disables the pre-apply snapshot.
    #[must_use]
    pub const fn with_make_backup(mut self, enabled: bool) -> Self {
        self.make_backup = enabled;
        self
    }

    /// Enables or disables deleting the snapshot after restore.
    #[must_use]
    pub const fn with_remove_backup(mut self, enabled: bool) -> Self {
        self.remove_backup = enabled;
        self
    }

    /// Forces `netsh` on Windows.
    #[must_use]
    pub const fn with_prefer_legacy_windows_tool(mut self, enabled: bool) -> Self {
        self.prefer_legacy_windows_tool = enabled;
        self
    }

    /// Chooses DHCP (`true`) or the captured backup (`false`) for macOS
    /// restores.
    #[must_use]
    pub const fn with_use_dhcp_on_restore(mut self, enabled: bool) -> Self {
        self.use_dhcp_on_restore = enabled;
        self
    }

    /// Turns diagnostic narration on or off.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    /// Turns the Linux immutable-attribute toggling on or off.
    #[must_use]
    pub const fn with_lock_resolver(mut self, enabled: bool) -> Self {
        self.lock_resolver = enabled;
        self
    }

    /// Requests all-or-nothing reporting for the interface fan-out.
    #[must_use]
    pub const fn with_require_all_interfaces(mut self, enabled: bool) -> Self {
        self.require_all_interfaces = enabled;
        self
    }

    /// Overrides the admin prompt bound.
    #[must_use]
    pub const fn with_elevation_timeout(mut self, timeout: Duration) -> Self {
        self.elevation_timeout = timeout;
        self
    }

    /// Checks every field in one pass.
    ///
    /// The backup name becomes part of a file name, so it may not contain
    /// separators, whitespace or control characters.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Validation`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        let name = self.backup_name.as_str();
        if name.is_empty() {
            return Err(invalid("backup name must not be empty"));
        }
        if name.len() > MAX_BACKUP_NAME_LEN {
            return Err(invalid(format!(
                "backup name exceeds {MAX_BACKUP_NAME_LEN} bytes"
            )));
        }
        if name == "." || name == ".." {
            return Err(invalid(format!("backup name '{name}' is reserved")));
        }
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, '/' | '\\') || c.is_whitespace() || c.is_control())
        {
            return Err(invalid(format!(
                "backup name '{}' contains forbidden character {c:?}",
                name.escape_debug()
            )));
        }
        if self.elevation_timeout.is_zero() {
            return Err(invalid("elevation timeout must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ChangerError {
    ChangerError::Validation(msg.into())
}

/// Default Linux resolver file.
const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Default macOS directory for backup artifacts.
const DEFAULT_MACOS_BACKUP_DIR: &str = "/Library/Caches";

/// Filesystem locations touched by the engine.
///
/// The defaults are the real system paths; tests point them at a temporary
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    resolv_conf: PathBuf,
    macos_backup_dir: PathBuf,
}

impl Paths {
    /// The real system locations.
    #[must_use]
    pub fn system() -> Self {
        Self {
            resolv_conf: PathBuf::from(DEFAULT_RESOLV_CONF),
            macos_backup_dir: PathBuf::from(DEFAULT_MACOS_BACKUP_DIR),
        }
    }

    /// Places both the resolver file and backup directory under `root`.
    #[must_use]
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            resolv_conf: root.join("resolv.conf"),
            macos_backup_dir: root.join("caches"),
        }
    }

    /// The Linux resolver file.
    #[must_use]
    pub fn resolv_conf(&self) -> &Path {
        &self.resolv_conf
    }

    /// The macOS backup directory.
    #[must_use]
    pub fn macos_backup_dir(&self) -> &Path {
        &self.macos_backup_dir
    }

    /// `<resolver file>.<backup_name>`.
    #[must_use]
    pub fn linux_backup(&self, backup_name: &str) -> PathBuf {
        let mut name = self.resolv_conf.as_os_str().to_os_string();
        name.push(".");
        name.push(backup_name);
        PathBuf::from(name)
    }

    /// `<backup dir>/<backup_name>.txt`.
    #[must_use]
    pub fn macos_backup(&self, backup_name: &str) -> PathBuf {
        self.macos_backup_dir.join(format!("{backup_name}.txt"))
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = ChangerOptions::default();
        assert_eq!(o.backup_name, "before-dns-changer");
        assert!(o.make_backup);
        assert!(!o.remove_backup);
        assert!(!o.prefer_legacy_windows_tool);
        assert!(o.use_dhcp_on_restore);
        assert!(o.logging_enabled);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn rejects_path_like_backup_names() {
        for name in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", "two words", "tab\there"] {
            let o = ChangerOptions::default().with_backup_name(name);
            assert!(
                matches!(o.validate(), Err(ChangerError::Validation(_))),
                "{name:?} should be rejected"
            );
        }
        let long = "x".repeat(MAX_BACKUP_NAME_LEN + 1);
        assert!(ChangerOptions::default().with_backup_name(long).validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let o = ChangerOptions::default().with_elevation_timeout(Duration::ZERO);
        assert!(o.validate().is_err());
    }

    #[test]
    fn backup_paths() {
        let paths = Paths::system();
        assert_eq!(
            paths.linux_backup("before-dns-changer"),
            PathBuf::from("/etc/resolv.conf.before-dns-changer")
        );
        assert_eq!(
            paths.macos_backup("before-dns-changer"),
            PathBuf::from("/Library/Caches/before-dns-changer.txt")
        );
    }

    #[test]
    fn paths_under_root() {
        let paths = Paths::under("/tmp/x");
        assert_eq!(paths.resolv_conf(), Path::new("/tmp/x/resolv.conf"));
        assert_eq!(paths.linux_backup("b"), PathBuf::from("/tmp/x/resolv.conf.b"));
        assert_eq!(paths.macos_backup("b"), PathBuf::from("/tmp/x/caches/b.txt"));
    }
}
