use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::AudienceHost;

#[derive(Parser)]
#[command(name = "stagecast")]
#[command(author, version, about)]
#[command(long_about = "A slideshow presenter with a live-synchronized audience window.\n\n\
    Present on your laptop while a second window mirrors the current slide,\n\
    jokes and camera overlay for the room.\n\n\
    Examples:\n  \
    stagecast                       Present the bundled decks\n  \
    stagecast talk/                 Present a deck directory (deck.yaml)\n  \
    stagecast talk.md --windowed    Present a markdown deck in a window\n  \
    stagecast --audience browser    Show the audience in the system browser")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Deck directories or markdown files to present (bundled decks when omitted)
    pub decks: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long)]
    pub windowed: bool,

    /// Start on a specific slide (1-indexed)
    #[arg(long)]
    pub slide: Option<usize>,

    /// Start with the deck of this id or name
    #[arg(long)]
    pub deck: Option<String>,

    /// Where to show the audience window (overrides config)
    #[arg(long, value_enum)]
    pub audience: Option<AudienceHost>,

    /// Port for the browser audience server (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Open the audience window right away
    #[arg(long)]
    pub open_audience: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Present the bundled demo decks
    Demo {
        /// Launch in a window instead of fullscreen
        #[arg(long)]
        windowed: bool,

        /// Open the audience window right away
        #[arg(long)]
        open_audience: bool,
    },

    /// List available decks
    Decks {
        /// Extra deck directories or markdown files to include
        paths: Vec<PathBuf>,
    },

    /// Show the slides and jokes of a deck
    Inspect {
        /// Deck directory, markdown file, or bundled deck id
        deck: String,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.theme, audience.host, jokes.default_duration_ms)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Demo { windowed, open_audience }) => {
                crate::commands::present::run(crate::commands::present::PresentArgs {
                    decks: Vec::new(),
                    windowed,
                    slide: None,
                    deck: None,
                    audience: None,
                    port: None,
                    open_audience,
                })
            }
            Some(Commands::Decks { paths }) => crate::commands::decks::run(&paths),
            Some(Commands::Inspect { deck }) => crate::commands::inspect::run(&deck),
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                crate::commands::version::run();
                Ok(())
            }
            None => {
                for path in &self.decks {
                    if !path.exists() {
                        anyhow::bail!("Deck not found: {}", path.display());
                    }
                }
                crate::commands::present::run(crate::commands::present::PresentArgs {
                    decks: self.decks,
                    windowed: self.windowed,
                    slide: self.slide,
                    deck: self.deck,
                    audience: self.audience,
                    port: self.port,
                    open_audience: self.open_audience,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_present_flags() {
        let cli = Cli::try_parse_from([
            "stagecast",
            "talk",
            "--windowed",
            "--slide",
            "3",
            "--audience",
            "browser",
            "--port",
            "9000",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.decks, vec![PathBuf::from("talk")]);
        assert!(cli.windowed);
        assert_eq!(cli.slide, Some(3));
        assert_eq!(cli.audience, Some(AudienceHost::Browser));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_demo() {
        let cli = Cli::try_parse_from(["stagecast", "demo", "--windowed"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Demo {
                windowed: true,
                open_audience: false
            })
        ));
    }

    #[test]
    fn test_parse_subcommand() {
        let cli = Cli::try_parse_from(["stagecast", "config", "set", "audience.host", "browser"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Set { .. }
            })
        ));
    }
}
