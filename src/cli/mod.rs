//! CLI module for Synocast.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Synocast - mirror video channels and playlists as audio podcasts
///
/// Downloads the best matching audio stream of each recent video into one
/// directory per source and keeps each directory within its size cap.
#[derive(Parser, Debug)]
#[command(name = "synocast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror every configured source
    Run {
        /// Configuration file (JSON, or TOML with a .toml extension)
        config: Option<String>,

        /// Override the configured output directory
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Select streams and plan retention without downloading or deleting
        #[arg(long)]
        dry_run: bool,

        /// Exit with an error if any video or source failed
        #[arg(long)]
        strict: bool,

        /// yt-dlp executable to use
        #[arg(long, env = "SYNOCAST_YTDLP", default_value = "yt-dlp")]
        ytdlp: String,
    },

    /// Validate the configuration and show the effective settings per source
    Check {
        /// Configuration file
        config: Option<String>,
    },

    /// Check system requirements and configuration
    Doctor {
        /// Configuration file
        config: Option<String>,

        /// yt-dlp executable to check
        #[arg(long, env = "SYNOCAST_YTDLP", default_value = "yt-dlp")]
        ytdlp: String,
    },
}
