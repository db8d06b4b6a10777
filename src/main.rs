use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dns_changer::{ChangerOptions, DEFAULT_BACKUP_NAME, DnsChanger, DnsServerList, Outcome};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dns-changer")]
#[command(author, version, about = "Point the system at a pair of DNS servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply a primary and secondary DNS server.
    Set {
        /// Primary server address.
        primary: String,
        /// Secondary server address.
        secondary: String,
        /// Do not snapshot the current configuration first.
        #[arg(long)]
        no_backup: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Restore the configuration saved by `set`.
    Restore {
        /// Delete the backup after restoring.
        #[arg(long)]
        remove_backup: bool,
        /// macOS: replay the saved servers instead of reverting to DHCP.
        #[arg(long)]
        from_backup: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// List the interfaces that would be configured.
    Interfaces,
    /// Print the detected platform.
    Platform,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Name of the backup to write or read.
    #[arg(long, default_value = DEFAULT_BACKUP_NAME)]
    backup_name: String,
    /// Windows: use netsh even on versions that support PowerShell.
    #[arg(long)]
    prefer_netsh: bool,
    /// Fail if any interface could not be configured.
    #[arg(long)]
    strict: bool,
    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
    /// Seconds to wait for an administrator prompt.
    #[arg(long, default_value_t = 60)]
    prompt_timeout: u64,
}

impl CommonArgs {
    fn options(&self) -> ChangerOptions {
        ChangerOptions::default()
            .with_backup_name(self.backup_name.clone())
            .with_prefer_legacy_windows_tool(self.prefer_netsh)
            .with_require_all_interfaces(self.strict)
            .with_logging(!self.quiet)
            .with_elevation_timeout(Duration::from_secs(self.prompt_timeout))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dns_changer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(Cli::parse()).await {
        Ok(Some(Outcome::Skipped { reason })) => {
            eprintln!("skipped: {reason}");
            ExitCode::from(2)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Option<Outcome>> {
    let changer = DnsChanger::detect().await;

    match cli.command {
        Command::Set {
            primary,
            secondary,
            no_backup,
            common,
        } => {
            let servers = DnsServerList::parse(vec![primary, secondary])?;
            let options = common.options().with_make_backup(!no_backup);
            let outcome = changer
                .apply(&servers, &options)
                .await
                .context("failed to set DNS servers")?;
            print_report(&outcome);
            Ok(Some(outcome))
        }
        Command::Restore {
            remove_backup,
            from_backup,
            common,
        } => {
            let options = common
                .options()
                .with_remove_backup(remove_backup)
                .with_use_dhcp_on_restore(!from_backup);
            let outcome = changer
                .restore(&options)
                .await
                .context("failed to restore DNS servers")?;
            print_report(&outcome);
            Ok(Some(outcome))
        }
        Command::Interfaces => {
            let list = changer
                .list_interfaces(&ChangerOptions::default().with_logging(false))
                .await?;
            for iface in &list.targets {
                println!("{iface}");
            }
            for name in &list.ignored {
                println!("{name} (ignored)");
            }
            Ok(None)
        }
        Command::Platform => {
            println!("{}", changer.platform());
            Ok(None)
        }
    }
}

fn print_report(outcome: &Outcome) {
    let Some(report) = outcome.report() else {
        return;
    };
    for name in &report.succeeded {
        println!("ok      {name}");
    }
    for failure in &report.failed {
        println!("failed  {}: {}", failure.interface, failure.reason);
    }
    for name in &report.ignored {
        if !name.is_empty() {
            println!("ignored {name}");
        }
    }
}
