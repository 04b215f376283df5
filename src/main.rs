use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use dealflow::adapter::inbound::cli::command::{CheckCommand, Cli, Commands, ConfigCommand};
use dealflow::adapter::inbound::cli::output::{self, OutputConfig};
use dealflow::adapter::inbound::cli::{check, config, list, run, stats};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose), &cli.color);

    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => run::execute(&args)
            .await
            .with_context(|| format!("engine stopped ({})", args.config.display())),
        Commands::Stats(args) => stats::execute(&args.config)
            .await
            .context("cannot read statistics"),
        Commands::Accounts(args) => list::execute_accounts(&args.config)
            .await
            .context("cannot list accounts"),
        Commands::Transactions(args) => list::execute_transactions(&args)
            .await
            .context("cannot list transactions"),
        Commands::Config(ConfigCommand::Init(args)) => {
            Ok(config::execute_init(&args.path, args.force)?)
        }
        Commands::Config(ConfigCommand::Show(args)) => Ok(config::execute_show(&args.config)?),
        Commands::Config(ConfigCommand::Validate(args)) => {
            Ok(config::execute_validate(&args.config)?)
        }
        Commands::Check(CheckCommand::Config(args)) => Ok(check::execute_config(&args.config)?),
        Commands::Check(CheckCommand::Health(args)) => Ok(check::execute_health(&args.config)?),
    }
}
