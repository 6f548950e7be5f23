//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Satiety - voice meal logging
#[derive(Parser, Debug)]
#[command(name = "satiety")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file, without extension
    #[arg(short, long, default_value = "config/satiety")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP proxy and static file server
    Serve,

    /// Log one meal from two recordings
    Log(LogArgs),

    /// Print the patterns report as JSON
    Patterns,

    /// Print daily targets for a height and weight
    Targets {
        /// Height in inches (48-96)
        #[arg(long)]
        height_in: f64,

        /// Weight in pounds (50-500)
        #[arg(long)]
        weight_lb: f64,
    },
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// WAV file describing the meal
    #[arg(long)]
    pub meal: PathBuf,

    /// WAV file answering the clarifying question
    #[arg(long)]
    pub answer: PathBuf,

    /// Voice ID for spoken replies (default: configured voice)
    #[arg(long)]
    pub voice: Option<String>,

    /// Write spoken replies here instead of discarding them
    #[arg(long)]
    pub speech_dir: Option<PathBuf>,

    /// Take each recording's real duration; Ctrl-C stops it early
    #[arg(long)]
    pub realtime: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_command() {
        let cli = Cli::parse_from([
            "satiety",
            "log",
            "--meal",
            "meal.wav",
            "--answer",
            "answer.wav",
            "--realtime",
        ]);
        match cli.command {
            Command::Log(args) => {
                assert_eq!(args.meal, PathBuf::from("meal.wav"));
                assert!(args.realtime);
                assert!(args.voice.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.config, "config/satiety");
    }

    #[test]
    fn test_parse_targets() {
        let cli = Cli::parse_from(["satiety", "targets", "--height-in", "70", "--weight-lb", "160"]);
        assert!(matches!(
            cli.command,
            Command::Targets { height_in, weight_lb } if height_in == 70.0 && weight_lb == 160.0
        ));
    }
}
