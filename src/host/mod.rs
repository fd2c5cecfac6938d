//! Video host abstraction for Synocast.
//!
//! Provides a trait-based interface to the remote service that lists videos,
//! describes their audio streams and transfers their bytes.

mod ytdlp;

pub use ytdlp::{normalize_handle, YtDlpHost};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    /// Host-side channel identifier.
    pub id: String,
    /// Normalized `@handle`.
    pub handle: String,
    /// Channel title, if reported.
    pub title: Option<String>,
}

/// A remote video as returned by a channel or playlist listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Missing for live or upcoming broadcasts.
    pub duration: Option<Duration>,
}

/// Full metadata for a single video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub url: String,
    pub title: String,
    pub duration: Option<Duration>,
    pub channel: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// One audio-only encoding offered for a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamOption {
    /// Container / file extension, e.g. `webm`.
    pub container: String,
    /// Bits per second.
    pub bitrate: u64,
    pub codec: String,
    /// Audio language code; `None` when the host does not tag the track.
    pub language: Option<String>,
    /// Whether this is the video's default (original) audio track.
    pub is_default_language: bool,
    /// Size in bytes, if known in advance.
    pub size: Option<u64>,
    /// Direct media URL.
    pub url: String,
    /// Headers the host requires when fetching `url`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl AudioStreamOption {
    /// Language code, treating blank tags as untagged.
    pub fn language_code(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

impl std::fmt::Display for AudioStreamOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {} bps, codec: {}, lang: {} ({})",
            self.container,
            self.bitrate,
            self.codec,
            self.language_code().unwrap_or("none"),
            if self.is_default_language { "default" } else { "alternate" }
        )?;
        if let Some(size) = self.size {
            write!(f, ", {} bytes", size)?;
        }
        Ok(())
    }
}

/// Receives download progress as a fraction in `0.0..=1.0`.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Trait for video hosting services.
///
/// All operations are fallible and may be cancelled by dropping the future.
#[async_trait]
pub trait VideoHost: Send + Sync {
    /// Resolve a channel handle (with or without `@`) to a channel.
    async fn resolve_channel(&self, handle: &str) -> Result<ChannelRef>;

    /// List a channel's uploads, newest first, up to `limit` items.
    async fn list_uploads(&self, channel: &ChannelRef, limit: usize) -> Result<Vec<VideoCandidate>>;

    /// List a playlist's videos in playlist order, up to `limit` items.
    async fn list_playlist(&self, url: &str, limit: usize) -> Result<Vec<VideoCandidate>>;

    /// Fetch metadata for a single video.
    async fn fetch_video(&self, url: &str) -> Result<VideoMetadata>;

    /// Fetch the audio-only streams available for a video.
    async fn fetch_audio_streams(&self, url: &str) -> Result<Vec<AudioStreamOption>>;

    /// Download a stream to `path`, returning the number of bytes written.
    async fn download(
        &self,
        stream: &AudioStreamOption,
        path: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<u64>;
}
