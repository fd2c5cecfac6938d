//! yt-dlp backed video host.
//!
//! Listings, metadata and stream manifests come from `yt-dlp --dump-json`;
//! the audio bytes themselves are fetched directly over HTTP.

use super::{AudioStreamOption, ChannelRef, ProgressFn, VideoCandidate, VideoHost, VideoMetadata};
use crate::error::{Result, SynocastError};
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Video host that shells out to yt-dlp.
pub struct YtDlpHost {
    binary: String,
    http: reqwest::Client,
    /// Last `--dump-json` result, shared by `fetch_video` and `fetch_audio_streams`.
    last_dump: Mutex<Option<(String, Value)>>,
}

impl YtDlpHost {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    /// Use a specific yt-dlp executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            http: reqwest::Client::new(),
            last_dump: Mutex::new(None),
        }
    }

    /// Run yt-dlp with the given arguments and return its stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SynocastError::ToolNotFound(self.binary.clone())
                } else {
                    SynocastError::ToolFailed(format!("Failed to run {}: {}", self.binary, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynocastError::ToolFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// List a flat playlist (channel tab or playlist) as candidates.
    async fn list_flat(&self, url: &str, limit: usize) -> Result<Vec<VideoCandidate>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let limit_str = limit.to_string();
        let stdout = self
            .run(&[
                "--dump-json",
                "--no-download",
                "--no-warnings",
                "--flat-playlist",
                "--playlist-end",
                limit_str.as_str(),
                url,
            ])
            .await
            .map_err(|e| {
                with_context(e, |e| {
                    SynocastError::Host(format!("Failed to list videos for {}: {}", url, e))
                })
            })?;

        let mut videos = parse_flat_listing(&stdout);
        videos.truncate(limit);
        Ok(videos)
    }

    /// Dump full JSON for a single video, reusing the previous dump for the same URL.
    async fn dump_video(&self, url: &str) -> Result<Value> {
        if let Some(json) = self.cached_dump(url) {
            return Ok(json);
        }

        let stdout = self
            .run(&["--dump-json", "--no-download", "--no-warnings", "--no-playlist", url])
            .await?;

        let json: Value = serde_json::from_str(stdout.trim()).map_err(|e| {
            SynocastError::Host(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        self.store_dump(url, &json);
        Ok(json)
    }

    fn cached_dump(&self, url: &str) -> Option<Value> {
        let cache = self.last_dump.lock().ok()?;
        let hit = cache
            .as_ref()
            .filter(|(cached_url, _)| cached_url == url)
            .map(|(_, json)| json.clone());
        hit
    }

    fn store_dump(&self, url: &str, json: &Value) {
        if let Ok(mut cache) = self.last_dump.lock() {
            *cache = Some((url.to_string(), json.clone()));
        }
    }
}

impl Default for YtDlpHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a tool error with context, leaving a missing tool reported as such.
fn with_context(
    error: SynocastError,
    wrap: impl FnOnce(SynocastError) -> SynocastError,
) -> SynocastError {
    match error {
        SynocastError::ToolNotFound(_) => error,
        other => wrap(other),
    }
}

fn handle_regex() -> Regex {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.)?youtube\.com/@([A-Za-z0-9._\-]+)")
        .expect("Invalid regex")
}

/// Normalize a configured channel handle to `@handle`.
///
/// Accepts `name`, `@name` or a full `https://www.youtube.com/@name` URL.
pub fn normalize_handle(input: &str) -> String {
    let input = input.trim();
    if let Some(caps) = handle_regex().captures(input) {
        return format!("@{}", &caps[1]);
    }
    format!("@{}", input.trim_start_matches('@'))
}

/// Parse the line-delimited JSON of a `--flat-playlist` listing.
fn parse_flat_listing(stdout: &str) -> Vec<VideoCandidate> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|json| {
            let id = json["id"].as_str()?.to_string();
            let url = json["url"]
                .as_str()
                .filter(|u| u.starts_with("http"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));

            Some(VideoCandidate {
                title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
                duration: parse_duration(&json["duration"]),
                id,
                url,
            })
        })
        .collect()
}

fn parse_duration(value: &Value) -> Option<Duration> {
    value
        .as_f64()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn parse_metadata(url: &str, json: &Value) -> VideoMetadata {
    let published_at = json["upload_date"].as_str().and_then(|date_str| {
        // yt-dlp returns date as YYYYMMDD
        chrono::NaiveDate::parse_from_str(date_str, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    });

    VideoMetadata {
        id: json["id"].as_str().unwrap_or_default().to_string(),
        url: json["webpage_url"].as_str().unwrap_or(url).to_string(),
        title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
        duration: parse_duration(&json["duration"]),
        channel: json["channel"]
            .as_str()
            .or_else(|| json["uploader"].as_str())
            .map(str::to_string),
        published_at,
    }
}

/// Extract audio-only formats from a full video dump.
fn parse_audio_formats(json: &Value) -> Vec<AudioStreamOption> {
    let Some(formats) = json["formats"].as_array() else {
        return Vec::new();
    };

    formats
        .iter()
        .filter(|f| f["vcodec"].as_str() == Some("none"))
        .filter(|f| f["acodec"].as_str().is_some_and(|c| c != "none"))
        .filter_map(|f| {
            let url = f["url"].as_str()?.to_string();
            let container = f["ext"].as_str()?.to_string();
            let kbps = f["abr"].as_f64().or_else(|| f["tbr"].as_f64()).unwrap_or(0.0);
            let note = f["format_note"].as_str().unwrap_or_default().to_lowercase();

            let headers: BTreeMap<String, String> = f["http_headers"]
                .as_object()
                .map(|map| {
                    map.iter()
                        .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                        .collect()
                })
                .unwrap_or_default();

            Some(AudioStreamOption {
                container,
                bitrate: (kbps * 1000.0).round() as u64,
                codec: f["acodec"].as_str().unwrap_or("unknown").to_string(),
                language: f["language"].as_str().map(str::to_string),
                is_default_language: f["language_preference"].as_i64().is_some_and(|p| p > 0)
                    || note.contains("original")
                    || note.contains("default"),
                size: f["filesize"].as_u64().or_else(|| f["filesize_approx"].as_u64()),
                url,
                headers,
            })
        })
        .collect()
}

#[async_trait]
impl VideoHost for YtDlpHost {
    #[instrument(skip(self))]
    async fn resolve_channel(&self, handle: &str) -> Result<ChannelRef> {
        let handle = normalize_handle(handle);
        let url = format!("https://www.youtube.com/{}", handle);

        let stdout = self
            .run(&[
                "--dump-single-json",
                "--no-download",
                "--no-warnings",
                "--flat-playlist",
                "--playlist-end",
                "1",
                &url,
            ])
            .await
            .map_err(|e| {
                with_context(e, |e| {
                    SynocastError::Host(format!("Failed to resolve {}: {}", handle, e))
                })
            })?;

        let json: Value = serde_json::from_str(stdout.trim())?;
        let id = json["channel_id"]
            .as_str()
            .or_else(|| json["id"].as_str())
            .ok_or_else(|| SynocastError::Host(format!("No channel found for {}", handle)))?
            .to_string();

        Ok(ChannelRef {
            id,
            title: json["channel"]
                .as_str()
                .or_else(|| json["uploader"].as_str())
                .map(str::to_string),
            handle,
        })
    }

    async fn list_uploads(&self, channel: &ChannelRef, limit: usize) -> Result<Vec<VideoCandidate>> {
        let url = format!("https://www.youtube.com/channel/{}/videos", channel.id);
        self.list_flat(&url, limit).await
    }

    async fn list_playlist(&self, url: &str, limit: usize) -> Result<Vec<VideoCandidate>> {
        self.list_flat(url, limit).await
    }

    async fn fetch_video(&self, url: &str) -> Result<VideoMetadata> {
        let json = self.dump_video(url).await?;
        Ok(parse_metadata(url, &json))
    }

    async fn fetch_audio_streams(&self, url: &str) -> Result<Vec<AudioStreamOption>> {
        let json = self
            .dump_video(url)
            .await
            .map_err(|e| with_context(e, |e| SynocastError::Manifest(e.to_string())))?;
        Ok(parse_audio_formats(&json))
    }

    async fn download(
        &self,
        stream: &AudioStreamOption,
        path: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<u64> {
        let url = url::Url::parse(&stream.url)
            .map_err(|e| SynocastError::Download(format!("Invalid stream URL: {}", e)))?;

        let mut request = self.http.get(url);
        for (name, value) in &stream.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?.error_for_status()?;
        let total = response.content_length().or(stream.size).filter(|t| *t > 0);

        let mut file = tokio::fs::File::create(path).await?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let data = chunk?;
            file.write_all(&data).await?;
            written += data.len() as u64;

            if let Some(total) = total {
                progress((written as f64 / total as f64).min(1.0));
            }
        }

        file.flush().await?;
        progress(1.0);
        Ok(written)
    }
}
