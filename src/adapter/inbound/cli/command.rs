//! Command-line interface definitions.
//!
//! Defines the CLI structure for the dealflow binary using `clap`. The
//! subcommands run the engine, inspect what the store holds and validate
//! configuration before a deployment.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::TransactionStatus;

use super::paths;

/// Peer-to-peer fiat/crypto deal orchestration
#[derive(Parser, Debug)]
#[command(name = "dealflow")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine in the foreground until Ctrl-C
    Run(RunArgs),

    /// Show transaction and negotiation statistics from the store
    Stats(ConfigPathArg),

    /// List exchange accounts known to the store
    Accounts(ConfigPathArg),

    /// List transactions, newest first
    Transactions(TransactionsArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `dealflow config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Generate a new configuration file from template.
    Init(ConfigInitArgs),
    /// Display the effective configuration with defaults applied.
    Show(ConfigPathArg),
    /// Validate a configuration file for correctness.
    Validate(ConfigPathArg),
}

/// Subcommands for `dealflow check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and semantics.
    Config(ConfigPathArg),
    /// Check that accounts, payment details and credentials are in place.
    Health(ConfigPathArg),
}

/// Shared argument struct for commands that require only a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Output path for the generated configuration file.
    #[arg(default_value_os_t = paths::default_config())]
    pub path: PathBuf,
    /// Overwrite the file if it already exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct TransactionsArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    /// Only list transactions in this status (e.g. waiting_payment).
    #[arg(long)]
    pub status: Option<TransactionStatus>,

    /// Maximum number of transactions to list.
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

/// Arguments for the `run` subcommand.
///
/// Optional fields override the corresponding configuration file values.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty-printed logs.
    #[arg(long)]
    pub json_logs: bool,

    /// Run against the paper exchange.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the SQLite database for persistence.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Enable Telegram notifications and the admin bot.
    #[arg(long)]
    pub telegram_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_command_factory_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name_and_version() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "dealflow");
        assert!(cmd.get_version().is_some());
    }

    #[test]
    fn test_parse_run_command_defaults() {
        let cli = Cli::try_parse_from(["dealflow", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(!args.dry_run);
        assert!(args.database.is_none());
        assert!(args.config.ends_with("config.toml"));
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "dealflow",
            "run",
            "-c",
            "/tmp/flow.toml",
            "--dry-run",
            "--log-level",
            "debug",
            "--database",
            "/tmp/flow.db",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("/tmp/flow.toml"));
        assert!(args.dry_run);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.database, Some(PathBuf::from("/tmp/flow.db")));
    }

    #[test]
    fn test_parse_transactions_status_filter() {
        let cli = Cli::try_parse_from([
            "dealflow",
            "transactions",
            "--status",
            "waiting_payment",
            "--limit",
            "5",
        ])
        .unwrap();
        let Commands::Transactions(args) = cli.command else {
            panic!("expected transactions");
        };
        assert_eq!(args.status, Some(TransactionStatus::WaitingPayment));
        assert_eq!(args.limit, 5);
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["dealflow", "transactions", "--status", "lost"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["dealflow", "stats", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Stats(_)));
    }

    #[test]
    fn test_parse_check_and_config_groups() {
        let cli = Cli::try_parse_from(["dealflow", "check", "health"]).unwrap();
        assert!(matches!(cli.command, Commands::Check(CheckCommand::Health(_))));

        let cli = Cli::try_parse_from(["dealflow", "config", "init", "out.toml", "--force"]).unwrap();
        let Commands::Config(ConfigCommand::Init(args)) = cli.command else {
            panic!("expected config init");
        };
        assert_eq!(args.path, PathBuf::from("out.toml"));
        assert!(args.force);
    }
}
