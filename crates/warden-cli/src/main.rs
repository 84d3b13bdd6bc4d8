//! Warden CLI - administration for the approval-gated safety layer.
//!
//! Manages the vault key, the credentials sealed under it, and shows the
//! configuration the safety layer resolves.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use warden_config::{Config, ShowFormat};
use warden_core::WardenHome;

mod commands;
pub mod config_bridge;
mod theme;

use commands::{CliContext, config, keys, vault};
use theme::Theme;

/// Warden - approval-gated action safety layer
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.warden/config.toml
    #[arg(long, global = true, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the vault sealing key
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Manage stored credentials
    Vault {
        #[command(subcommand)]
        command: VaultCommands,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Generate the vault key file
    Generate {
        /// Replace an existing key (it is kept as <key file>.previous)
        #[arg(long)]
        force: bool,
    },
    /// Show the id and source of the vault key
    Show,
}

#[derive(Subcommand)]
enum VaultCommands {
    /// Store a credential (read from --file or stdin)
    Save {
        /// Principal the credential belongs to
        principal: String,
        /// Read the credential from this file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print a stored credential to stdout
    Load {
        /// Principal to look up
        principal: String,
    },
    /// Delete a stored credential
    Delete {
        /// Principal to remove
        principal: String,
    },
    /// List principals with stored credentials
    List,
    /// Re-seal all credentials with the current key
    Rotate {
        /// Key file that sealed the existing records
        #[arg(long)]
        previous_key_file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
        /// Only show this section
        #[arg(long)]
        section: Option<String>,
    },
    /// Validate the configuration and print the effective limits
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Toml,
    Json,
}

impl From<OutputFormat> for ShowFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Toml => Self::Toml,
            OutputFormat::Json => Self::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    // Set up logging from config, with --verbose override.
    let mut log_config = match &loaded {
        Ok(resolved) => config_bridge::to_log_config(&resolved.config),
        Err(_) => warden_telemetry::LogConfig::new("info"),
    };
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = warden_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved = loaded?;
    let ctx = CliContext {
        config: resolved.config.clone(),
        home: WardenHome::resolve()?,
        env: std::env::vars().collect(),
    };

    match cli.command {
        Commands::Key { command } => match command {
            KeyCommands::Generate { force } => keys::generate_key(&ctx, force),
            KeyCommands::Show => keys::show_key(&ctx),
        },
        Commands::Vault { command } => match command {
            VaultCommands::Save { principal, file } => {
                vault::save(&ctx, &principal, file.as_deref())
            },
            VaultCommands::Load { principal } => vault::load(&ctx, &principal),
            VaultCommands::Delete { principal } => vault::delete(&ctx, &principal),
            VaultCommands::List => vault::list(&ctx),
            VaultCommands::Rotate { previous_key_file } => {
                vault::rotate(&ctx, &previous_key_file)
            },
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show { format, section } => {
                config::show_config(&resolved, format.into(), section.as_deref())
            },
            ConfigCommands::Check => config::check_config(&ctx, &resolved.loaded_files),
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_vault_rotate() {
        let cli = Cli::try_parse_from([
            "warden",
            "vault",
            "rotate",
            "--previous-key-file",
            "/tmp/old.key",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Vault {
                command: VaultCommands::Rotate { ref previous_key_file }
            } if previous_key_file == &PathBuf::from("/tmp/old.key")
        ));
    }

    #[test]
    fn test_parse_config_show_json() {
        let cli =
            Cli::try_parse_from(["warden", "config", "show", "--format", "json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show {
                    format: OutputFormat::Json,
                    section: None
                }
            }
        ));
    }

    #[test]
    fn test_parse_key_generate_and_missing_principal() {
        let cli = Cli::try_parse_from(["warden", "key", "generate", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Key {
                command: KeyCommands::Generate { force: true }
            }
        ));
        assert!(Cli::try_parse_from(["warden", "vault", "save"]).is_err());
    }
}
