//! Privilege checks before mutating system state.
//!
//! Linux needs root outright. Windows needs an elevated (administrator)
//! process. macOS can run unprivileged: mutating commands are then batched
//! into a single `osascript ... with administrator privileges` call so the
//! user sees one admin prompt per operation.

use crate::command::{CommandOutput, CommandRunner, SystemCommand};
use crate::error::{ChangerError, Result};
use crate::platform::Platform;
use crate::util::{applescript_escape, effective_uid, shell_quote};
use async_trait::async_trait;

/// How mutating commands must be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// The process already has the rights; run commands as-is.
    Direct,
    /// Wrap commands in the platform's admin prompt.
    Prompt,
}

/// Confirms sufficient rights before any mutation.
#[async_trait]
pub trait PrivilegeGuard: Send + Sync {
    /// Checks the rights needed to change DNS settings on `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Permission`] when the process cannot mutate
    /// and no prompt mechanism applies.
    async fn ensure_elevated(
        &self,
        platform: Platform,
        runner: &dyn CommandRunner,
    ) -> Result<Elevation>;
}

/// Checks the real process: effective uid on Unix, `net session` on
/// Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPrivilegeGuard;

#[async_trait]
impl PrivilegeGuard for SystemPrivilegeGuard {
    async fn ensure_elevated(
        &self,
        platform: Platform,
        runner: &dyn CommandRunner,
    ) -> Result<Elevation> {
        match platform {
            Platform::Linux => {
                if effective_uid() == Some(0) {
                    Ok(Elevation::Direct)
                } else {
                    Err(ChangerError::Permission(
                        "must run as root to change DNS settings".into(),
                    ))
                }
            }
            Platform::MacOs => Ok(if effective_uid() == Some(0) {
                Elevation::Direct
            } else {
                Elevation::Prompt
            }),
            Platform::Windows(_) => {
                // `net session` only succeeds from an elevated process.
                let output = runner.run(&SystemCommand::new("net").arg("session")).await;
                if output.success() {
                    Ok(Elevation::Direct)
                } else {
                    Err(ChangerError::Permission(
                        "administrator privileges are required to change DNS settings".into(),
                    ))
                }
            }
            Platform::Unsupported => Err(ChangerError::Permission(
                "no privilege model for this platform".into(),
            )),
        }
    }
}

/// A guard that reports a fixed answer without inspecting the process.
///
/// Used when the caller has already established privilege (for example a
/// launchd helper running as root) and in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrivilege(pub std::result::Result<Elevation, &'static str>);

#[async_trait]
impl PrivilegeGuard for FixedPrivilege {
    async fn ensure_elevated(
        &self,
        _platform: Platform,
        _runner: &dyn CommandRunner,
    ) -> Result<Elevation> {
        self.0.map_err(|msg| ChangerError::Permission(msg.to_string()))
    }
}

/// Builds one `osascript` invocation that runs every group of commands with
/// administrator privileges and prints `<index>:<exit code>` per group.
///
/// Commands inside a group are chained with `&&`, so a group stops at its
/// first failure.
#[must_use]
pub fn admin_batch(groups: &[Vec<SystemCommand>]) -> SystemCommand {
    let script = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let chain = group
                .iter()
                .map(|cmd| {
                    std::iter::once(cmd.program.as_str())
                        .chain(cmd.args.iter().map(String::as_str))
                        .map(shell_quote)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join(" && ");
            format!("{{ {chain}; }} >/dev/null 2>&1; echo \"{i}:$?\"")
        })
        .collect::<Vec<_>>()
        .join("; ");
    SystemCommand::new("osascript").arg("-e").arg(format!(
        "do shell script \"{}\" with administrator privileges without altering line endings",
        applescript_escape(&script)
    ))
}

/// Reads the per-command exit codes printed by an [`admin_batch`] run.
///
/// # Errors
///
/// Returns [`ChangerError::Permission`] if the prompt was dismissed or the
/// batch never ran.
pub fn parse_admin_batch(output: &CommandOutput, count: usize) -> Result<Vec<Option<i32>>> {
    if !output.success() {
        let reason = if output.stderr.contains("-128") {
            "admin prompt was dismissed".to_string()
        } else {
            format!("admin prompt failed: {}", output.failure_reason())
        };
        return Err(ChangerError::Permission(reason));
    }

    let mut codes = vec![None; count];
    for line in output.stdout.split(['\n', '\r']) {
        if let Some((index, code)) = line.trim().split_once(':') {
            if let (Ok(index), Ok(code)) = (index.parse::<usize>(), code.parse::<i32>()) {
                if let Some(slot) = codes.get_mut(index) {
                    *slot = Some(code);
                }
            }
        }
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_script_quotes_service_names() {
        let batch = admin_batch(&[
            vec![SystemCommand::new("networksetup").args(["-setdnsservers", "Wi-Fi", "1.1.1.1"])],
            vec![SystemCommand::new("networksetup").args(["-setdnsservers", "USB LAN", "Empty"])],
        ]);
        assert_eq!(batch.program, "osascript");
        assert_eq!(batch.args[0], "-e");
        let script = &batch.args[1];
        assert!(script.starts_with("do shell script \""));
        assert!(script.contains(
            "{ networksetup -setdnsservers Wi-Fi 1.1.1.1; } >/dev/null 2>&1; echo \\\"0:$?\\\""
        ));
        assert!(script.contains("'USB LAN' Empty"));
        assert!(script.ends_with("with administrator privileges without altering line endings"));
    }

    #[test]
    fn batch_groups_chain_with_and() {
        let batch = admin_batch(&[vec![
            SystemCommand::new("first").arg("a"),
            SystemCommand::new("second").arg("b"),
        ]]);
        assert!(batch.args[1].contains("{ first a && second b; }"));
    }

    #[test]
    fn parses_batch_codes() {
        let out = CommandOutput::ok("0:0\r1:4\r");
        assert_eq!(parse_admin_batch(&out, 3).unwrap(), vec![Some(0), Some(4), None]);
    }

    #[test]
    fn dismissed_prompt_is_permission_error() {
        let out = CommandOutput::failed(1, "execution error: User canceled. (-128)");
        let err = parse_admin_batch(&out, 1).unwrap_err();
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("dismissed"));
    }

    #[tokio::test]
    async fn fixed_privilege_reports_its_answer() {
        let runner = crate::command::SystemRunner;
        let ok = FixedPrivilege(Ok(Elevation::Prompt));
        assert_eq!(
            ok.ensure_elevated(Platform::MacOs, &runner).await.unwrap(),
            Elevation::Prompt
        );
        let denied = FixedPrivilege(Err("nope"));
        assert!(
            denied
                .ensure_elevated(Platform::Linux, &runner)
                .await
                .unwrap_err()
                .is_permission_denied()
        );
    }

    #[tokio::test]
    async fn unsupported_platform_is_denied() {
        let err = SystemPrivilegeGuard
            .ensure_elevated(Platform::Unsupported, &crate::command::SystemRunner)
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }
}
