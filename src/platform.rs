//! Host platform detection.

use crate::command::{CommandRunner, SystemCommand};
use std::fmt;

/// Which Windows tool configures adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowsTool {
    /// `netsh interface ipv4 ...` (Windows 7 and earlier).
    Netsh,
    /// `Set-DnsClientServerAddress` (Windows 8 and later).
    PowerShell,
}

impl WindowsTool {
    /// Picks a tool from the OS version.
    ///
    /// Versions up to 6.1 (Windows 7) and any 5.x (XP/2003) use `netsh`;
    /// everything newer, or an unknown version, uses PowerShell.
    /// `prefer_legacy` always wins.
    #[must_use]
    pub const fn select(version: Option<OsVersion>, prefer_legacy: bool) -> Self {
        if prefer_legacy {
            return Self::Netsh;
        }
        match version {
            Some(OsVersion { major, minor }) if (major <= 6 && minor <= 1) || major == 5 => {
                Self::Netsh
            }
            _ => Self::PowerShell,
        }
    }
}

/// Major and minor OS version numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsVersion {
    /// Major version (10 for Windows 10/11).
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl OsVersion {
    /// Creates a version.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses `cmd /C ver` output such as
    /// `Microsoft Windows [Version 10.0.19045.3803]`.
    #[must_use]
    pub fn parse_ver_output(output: &str) -> Option<Self> {
        let start = output.find("Version ")? + "Version ".len();
        let rest = &output[start..];
        let end = rest.find(']').unwrap_or(rest.len());
        let mut parts = rest[..end].trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some(Self { major, minor })
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The configuration mechanism for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `/etc/resolv.conf` editing.
    Linux,
    /// `networksetup` per network service.
    MacOs,
    /// Per-adapter `netsh` or PowerShell, as detected.
    Windows(WindowsTool),
    /// Anything else; every operation is skipped.
    Unsupported,
}

impl Platform {
    /// Maps an OS identity (`std::env::consts::OS` style) to a platform.
    ///
    /// Windows starts out with PowerShell; use [`detect`](Self::detect) to
    /// pick the tool from the running version.
    #[must_use]
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows(WindowsTool::PowerShell),
            _ => Self::Unsupported,
        }
    }

    /// The platform this binary was built for, without version probing.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Detects the host platform, probing the Windows version with
    /// `cmd /C ver` to choose between `netsh` and PowerShell.
    pub async fn detect(runner: &dyn CommandRunner) -> Self {
        match Self::current() {
            Self::Windows(_) => {
                let output = runner
                    .run(&SystemCommand::new("cmd").args(["/C", "ver"]))
                    .await;
                let version = output
                    .success()
                    .then(|| OsVersion::parse_ver_output(&output.stdout))
                    .flatten();
                let tool = WindowsTool::select(version, false);
                tracing::debug!(
                    version = ?version.map(|v| v.to_string()),
                    tool = ?tool,
                    "Detected Windows version"
                );
                Self::Windows(tool)
            }
            other => other,
        }
    }

    /// Short lowercase name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows(_) => "windows",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows(tool) => write!(f, "windows ({tool:?})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_tool_for_old_windows() {
        for (major, minor) in [(6, 1), (6, 0), (5, 1), (5, 2)] {
            assert_eq!(
                WindowsTool::select(Some(OsVersion::new(major, minor)), false),
                WindowsTool::Netsh,
                "{major}.{minor}"
            );
        }
    }

    #[test]
    fn modern_tool_for_new_windows() {
        for (major, minor) in [(6, 2), (6, 3), (10, 0)] {
            assert_eq!(
                WindowsTool::select(Some(OsVersion::new(major, minor)), false),
                WindowsTool::PowerShell,
                "{major}.{minor}"
            );
        }
        assert_eq!(WindowsTool::select(None, false), WindowsTool::PowerShell);
    }

    #[test]
    fn prefer_legacy_overrides_detection() {
        assert_eq!(
            WindowsTool::select(Some(OsVersion::new(10, 0)), true),
            WindowsTool::Netsh
        );
        assert_eq!(WindowsTool::select(None, true), WindowsTool::Netsh);
    }

    #[test]
    fn parses_ver_output() {
        assert_eq!(
            OsVersion::parse_ver_output("\r\nMicrosoft Windows [Version 10.0.19045.3803]\r\n"),
            Some(OsVersion::new(10, 0))
        );
        assert_eq!(
            OsVersion::parse_ver_output("Microsoft Windows [Version 6.1.7601]"),
            Some(OsVersion::new(6, 1))
        );
        assert_eq!(OsVersion::parse_ver_output("garbage"), None);
    }

    #[test]
    fn os_identity_mapping() {
        assert_eq!(Platform::from_os_name("linux"), Platform::Linux);
        assert_eq!(Platform::from_os_name("macos"), Platform::MacOs);
        assert!(matches!(Platform::from_os_name("windows"), Platform::Windows(_)));
        assert_eq!(Platform::from_os_name("freebsd"), Platform::Unsupported);
        assert_eq!(Platform::from_os_name(""), Platform::Unsupported);
    }
}
