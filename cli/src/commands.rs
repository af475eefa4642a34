//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for docfiller
#[derive(Parser, Debug)]
#[command(name = "docfiller")]
#[command(author, version, about = "Fill forms with answers from one or several LLMs")]
#[command(long_about = r#"
docfiller answers every question of a form with an LLM and writes the answers back.

With consensus enabled every weighted provider is asked in parallel and the
answers are merged by weighted vote.

Configuration files are loaded from (in priority order):
1. DOCFILLER_* environment variables
2. --config <path>     Explicit config file
3. ./docfiller.toml    Project-level config
4. ~/.config/docfiller/config.toml   Global config

Example:
  docfiller fill survey.json -o answers.json
  docfiller fill survey.json --consensus
  docfiller profiles add historian "You are a meticulous historian."
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Keep settings in memory instead of the settings file
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fill a JSON form document
    Fill(FillArgs),

    /// Show configuration sources and validate the merged configuration
    Config,

    /// Manage answering profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args, Debug)]
pub struct FillArgs {
    /// Form document to fill
    #[arg(value_name = "FORM")]
    pub form: PathBuf,

    /// Write the answers here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Ask every weighted provider and merge the answers
    #[arg(long, conflicts_with = "no_consensus")]
    pub consensus: bool,

    /// Ask a single provider
    #[arg(long)]
    pub no_consensus: bool,

    /// Provider to ask when consensus is off
    #[arg(short, long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Profile to answer with
    #[arg(long, value_name = "KEY")]
    pub profile: Option<String>,

    /// Answer fields even if the document already has an answer
    #[arg(long)]
    pub refill: bool,

    /// Do not generate a system prompt for magic profiles
    #[arg(long)]
    pub no_magic: bool,
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// List built-in and custom profiles
    List,

    /// Add or replace a custom profile
    Add {
        key: String,
        system_prompt: String,
        /// Display name, defaults to the key
        #[arg(long)]
        name: Option<String>,
        /// Generate the system prompt from each form's questions
        #[arg(long)]
        magic: bool,
    },

    /// Delete a custom profile
    Delete { key: String },

    /// Select the profile used for filling
    Select { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the effective settings
    Show,

    /// Set consensus weights, e.g. `gpt-5=2 gemini=1`
    Weights {
        #[arg(value_name = "PROVIDER=WEIGHT", required = true)]
        weights: Vec<String>,
    },

    /// Turn consensus on or off
    Consensus {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Provider used when consensus is off
    Model { provider: String },

    /// Leave already answered fields alone
    SkipMarked {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fill() {
        let cli = Cli::parse_from([
            "docfiller",
            "-vv",
            "fill",
            "form.json",
            "--consensus",
            "-o",
            "out.json",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Fill(args) = cli.command else {
            panic!("expected fill");
        };
        assert!(args.consensus);
        assert!(!args.no_consensus);
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_parse_weights() {
        let cli = Cli::parse_from(["docfiller", "settings", "weights", "gpt-5=2", "gemini=1"]);
        let Command::Settings {
            action: SettingsAction::Weights { weights },
        } = cli.command
        else {
            panic!("expected settings weights");
        };
        assert_eq!(weights, vec!["gpt-5=2", "gemini=1"]);
    }
}
