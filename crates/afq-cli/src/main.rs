mod commands;
mod logging;

use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser};

#[derive(Parser)]
#[command(
    name = "afq",
    version,
    about = "Run automated fiber quantification from a TOML configuration"
)]
struct Cli {
    /// Path to the TOML configuration file
    config: PathBuf,

    /// Do not record usage
    #[arg(long)]
    notrack: bool,
}

fn main() -> anyhow::Result<()> {
    let matches = Cli::command()
        .after_help("Use --help to list every configurable parameter and its default.")
        .after_long_help(afq_core::defaults::render_defaults())
        .get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    logging::init("info");

    commands::run::execute(&cli.config, cli.notrack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_config_and_notrack() {
        let cli = Cli::try_parse_from(["afq", "study.toml", "--notrack"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("study.toml"));
        assert!(cli.notrack);
    }

    #[test]
    fn test_config_path_is_required() {
        assert!(Cli::try_parse_from(["afq"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["afq", "study.toml", "--dry-run"]).is_err());
    }
}
