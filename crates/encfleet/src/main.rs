mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use encfleet_core::Fleet;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    if !matches!(cli.command, Command::Config(_) | Command::Completions(_)) {
        config::apply_output_defaults(&mut cli.global)?;
    }

    match cli.command {
        // These never talk to a device
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Defaults(ref args) => commands::defaults::handle(args, &cli.global),
        Command::LocalSubnet => commands::local_subnet::handle(&cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "encfleet", &mut std::io::stdout());
            Ok(())
        }

        // Everything else needs device credentials
        cmd => {
            let fleet_config = config::resolve_fleet_config(&cli.global)?;
            let fleet = Fleet::new(fleet_config)?;

            tracing::debug!(command = ?cmd, subnet = %fleet.local_subnet(), "dispatching command");
            commands::dispatch(cmd, &fleet, &cli.global).await
        }
    }
}
