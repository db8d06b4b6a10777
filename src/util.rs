//! Internal utilities.

/// Returns the effective user id of this process, or `None` where the
/// concept does not exist.
#[must_use]
pub fn effective_uid() -> Option<u32> {
    #[cfg(unix)]
    {
        // SAFETY: `geteuid` has no preconditions and cannot fail.
        Some(unsafe { libc::geteuid() })
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Quotes `s` for a POSIX shell.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '%' | '+' | '='))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Escapes `s` for use inside an AppleScript string literal.
#[must_use]
pub fn applescript_escape(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', "\\\"")
}

/// Quotes `s` as a PowerShell single-quoted string.
#[must_use]
pub fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn effective_uid_matches_libc() {
        assert_eq!(effective_uid(), Some(unsafe { libc::geteuid() }));
    }

    #[test]
    fn shell_quoting() {
        assert_eq!(shell_quote("Wi-Fi"), "Wi-Fi");
        assert_eq!(shell_quote("fe80::1%en0"), "fe80::1%en0");
        assert_eq!(shell_quote("USB 10/100 LAN"), "'USB 10/100 LAN'");
        assert_eq!(shell_quote("Bob's iPhone"), r"'Bob'\''s iPhone'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn applescript_escaping() {
        assert_eq!(applescript_escape(r#"a "b" \c"#), r#"a \"b\" \\c"#);
    }

    #[test]
    fn powershell_quoting() {
        assert_eq!(powershell_quote("Ethernet 2"), "'Ethernet 2'");
        assert_eq!(powershell_quote("Bob's NIC"), "'Bob''s NIC'");
    }
}
