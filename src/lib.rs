//! Synocast - audio-only podcast mirror
//!
//! Periodically mirrors video channels and playlists to local audio files,
//! one directory per source, suitable for serving as a private podcast feed.
//!
//! # Architecture
//!
//! - `config` - Source list loading and validation
//! - `host` - Video host abstraction (listing, metadata, streams, download)
//! - `pipeline` - Duration gate, stream selection, file naming, retention
//! - `orchestrator` - Per-video, per-source and whole-run processing
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use synocast::config::Settings;
//! use synocast::host::YtDlpHost;
//! use synocast::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load_from(Path::new("config.json"))?;
//!     let orchestrator = Orchestrator::from_settings(&settings, Arc::new(YtDlpHost::new()), false);
//!
//!     let summary = orchestrator.run(&settings.sources).await;
//!     println!("Downloaded {} new episodes", summary.downloaded());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod pipeline;

pub use error::{Result, SynocastError};
