//! Per-call execution context.
//!
//! Everything a strategy needs for one apply or restore travels in an
//! [`OpContext`], including whether to narrate. Concurrent calls with
//! different logging settings therefore never see each other's choice.

use crate::command::{BestEffort, CommandOutput, CommandRunner, SystemCommand};
use crate::config::{ChangerOptions, Paths};
use crate::error::{ChangerError, Result};
use crate::outcome::{InterfaceFailure, Report};
use crate::privilege::{Elevation, PrivilegeGuard, admin_batch, parse_admin_batch};
use futures::future::join_all;
use std::sync::Arc;

/// Borrowed state for a single operation.
pub struct OpContext<'a> {
    /// Executes external commands.
    pub runner: Arc<dyn CommandRunner>,
    /// Confirms privileges before mutation.
    pub guard: &'a dyn PrivilegeGuard,
    /// Options of this call.
    pub options: &'a ChangerOptions,
    /// Filesystem locations.
    pub paths: &'a Paths,
}

/// One interface's share of a fan-out: its name and the commands to run
/// for it, in order.
pub struct InterfaceJob {
    /// Platform-native interface name, as reported in the [`Report`].
    pub interface: String,
    /// Run in order; the first failure ends the job.
    pub commands: Vec<SystemCommand>,
}

impl OpContext<'_> {
    /// Whether diagnostic narration is on for this call.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.options.logging_enabled
    }

    /// Logs the literal command line, then runs it.
    pub async fn run(&self, command: &SystemCommand) -> CommandOutput {
        narrate!(self.verbose(), command = %command, "Running command");
        let output = self.runner.run(command).await;
        if self.verbose() {
            tracing::debug!(
                command = %command,
                code = ?output.code,
                stdout = %output.stdout.trim(),
                "Command finished"
            );
        }
        output
    }

    /// Runs a mutating or required command; a non-zero exit is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ChangerError::Command`] if the command did not exit 0.
    pub async fn run_checked(&self, command: &SystemCommand) -> Result<CommandOutput> {
        self.run(command).await.into_result(command)
    }

    /// Runs a chain of fallbacks in the background: the first command that
    /// exits 0 ends the chain.
    pub fn spawn_first_success(
        &self,
        tasks: &mut BestEffort,
        label: &'static str,
        chain: Vec<SystemCommand>,
    ) {
        let runner = Arc::clone(&self.runner);
        let verbose = self.verbose();
        tasks.spawn(label, async move {
            let mut last = None;
            for command in chain {
                narrate!(verbose, command = %command, "Running best-effort command");
                let output = runner.run(&command).await;
                if output.success() {
                    return Ok(());
                }
                last = Some(output.into_result(&command));
            }
            last.map_or(Ok(()), |r| r.map(drop))
        });
    }

    /// Runs `action` in the background only if `probe` exits 0.
    pub fn spawn_if(
        &self,
        tasks: &mut BestEffort,
        label: &'static str,
        probe: SystemCommand,
        action: SystemCommand,
    ) {
        let runner = Arc::clone(&self.runner);
        let verbose = self.verbose();
        tasks.spawn(label, async move {
            narrate!(verbose, command = %probe, "Running best-effort probe");
            if !runner.run(&probe).await.success() {
                narrate!(verbose, step = label, "Probe failed, skipping");
                return Ok(());
            }
            narrate!(verbose, command = %action, "Running best-effort command");
            runner.run(&action).await.into_result(&action).map(drop)
        });
    }

    /// Configures every interface independently.
    ///
    /// With [`Elevation::Direct`] the interfaces run concurrently and each
    /// job stops at its first failing command. With [`Elevation::Prompt`]
    /// all jobs are sent through one admin prompt, bounded by the
    /// configured timeout; a dismissed or expired prompt fails the whole
    /// call before anything was changed.
    ///
    /// # Errors
    ///
    /// Only prompt failures are errors; per-interface failures land in the
    /// returned [`Report`].
    pub async fn fan_out(&self, elevation: Elevation, jobs: Vec<InterfaceJob>) -> Result<Report> {
        let mut report = Report::default();
        if jobs.is_empty() {
            narrate!(self.verbose(), "No interfaces to configure");
            return Ok(report);
        }

        match elevation {
            Elevation::Direct => {
                let results = join_all(jobs.iter().map(|job| self.run_job(job))).await;
                for (job, result) in jobs.into_iter().zip(results) {
                    match result {
                        Ok(()) => report.succeeded.push(job.interface),
                        Err(reason) => {
                            tracing::warn!(interface = %job.interface, %reason, "Interface not configured");
                            report.failed.push(InterfaceFailure::new(job.interface, reason));
                        }
                    }
                }
            }
            Elevation::Prompt => {
                let groups: Vec<Vec<SystemCommand>> =
                    jobs.iter().map(|job| job.commands.clone()).collect();
                let batch = admin_batch(&groups);
                narrate!(
                    self.verbose(),
                    interfaces = jobs.len(),
                    command = %batch,
                    "Requesting administrator privileges"
                );
                let timeout = self.options.elevation_timeout;
                let output = tokio::time::timeout(timeout, self.runner.run(&batch))
                    .await
                    .map_err(|_| ChangerError::ElevationTimeout { timeout })?;
                let codes = parse_admin_batch(&output, jobs.len())?;
                for (job, code) in jobs.into_iter().zip(codes) {
                    match code {
                        Some(0) => report.succeeded.push(job.interface),
                        other => {
                            let reason = other.map_or_else(
                                || "no status reported".to_string(),
                                |c| format!("exit code {c}"),
                            );
                            tracing::warn!(interface = %job.interface, %reason, "Interface not configured");
                            report.failed.push(InterfaceFailure::new(job.interface, reason));
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    async fn run_job(&self, job: &InterfaceJob) -> std::result::Result<(), String> {
        narrate!(self.verbose(), interface = %job.interface, "Configuring interface");
        for command in &job.commands {
            let output = self.run(command).await;
            if !output.success() {
                return Err(output.failure_reason());
            }
        }
        Ok(())
    }
}
