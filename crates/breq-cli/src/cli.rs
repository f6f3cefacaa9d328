use breq_config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run line-oriented device automation scripts
#[derive(Parser)]
#[command(name = "breq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Developer log verbosity on stderr (-d debug, -dd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script against the configured devices
    Run {
        /// Script file (.breq)
        script: PathBuf,

        /// Engine configuration; defaults apply when the file is absent
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Pause after every executed line; press Enter to continue
        #[arg(long)]
        single_block: bool,

        /// Connect an extra simulated device (repeatable)
        #[arg(long = "device", value_name = "NAME")]
        devices: Vec<String>,
    },

    /// Show how every line of a script is classified
    Check {
        /// Script file (.breq)
        script: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "breq",
            "run",
            "demo.breq",
            "--single-block",
            "--device",
            "alpha",
            "--device",
            "beta",
        ]);

        match cli.command {
            Commands::Run {
                script,
                config,
                single_block,
                devices,
            } => {
                assert_eq!(script, PathBuf::from("demo.breq"));
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_FILE));
                assert!(single_block);
                assert_eq!(devices, vec!["alpha", "beta"]);
            }
            Commands::Check { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_check_with_debug() {
        let cli = Cli::parse_from(["breq", "-dd", "check", "demo.breq"]);
        assert_eq!(cli.debug, 2);
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
