//! Pipeline orchestrator for Synocast.
//!
//! Runs each configured source in order: enumerate its videos, process them
//! oldest first, then apply the source's retention cap. Every video and every
//! source ends in a reported outcome; no failure stops its siblings.

use crate::config::{Settings, SourceDescriptor, SourceKind};
use crate::error::{Result, SynocastError};
use crate::host::{AudioStreamOption, VideoCandidate, VideoHost};
use crate::pipeline::{
    check_duration, enforce_retention, sanitize_file_name, select_stream, target_path,
    DurationVerdict, NoStreamReason, RetentionReport, PARTIAL_SUFFIX,
};
use futures::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Upper bound on fetching a video's metadata and stream manifest.
    pub manifest_timeout: Duration,
    /// Enumerate and select, but neither download nor delete.
    pub dry_run: bool,
    /// Draw a progress bar for each download.
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            manifest_timeout: Duration::from_secs(crate::config::DEFAULT_MANIFEST_TIMEOUT_SECS),
            dry_run: false,
            show_progress: false,
        }
    }
}

/// The main orchestrator for the Synocast pipeline.
pub struct Orchestrator {
    host: Arc<dyn VideoHost>,
    output_root: PathBuf,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(host: Arc<dyn VideoHost>, output_root: PathBuf, options: RunOptions) -> Self {
        Self {
            host,
            output_root,
            options,
        }
    }

    /// Build an orchestrator using the output root and timeout from `settings`.
    pub fn from_settings(settings: &Settings, host: Arc<dyn VideoHost>, dry_run: bool) -> Self {
        let options = RunOptions {
            manifest_timeout: settings.manifest_timeout(),
            dry_run,
            show_progress: true,
        };
        Self::new(host, settings.output_root(), options)
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Directory a source's files live in.
    pub fn source_dir(&self, source: &SourceDescriptor) -> PathBuf {
        self.output_root.join(source.directory_name())
    }

    /// Process every source in declaration order.
    pub async fn run(&self, sources: &[SourceDescriptor]) -> RunSummary {
        let mut summary = RunSummary::default();

        for source in sources {
            let report = AssertUnwindSafe(self.process_source(source))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("Processing of source {} panicked", source.name);
                    SourceReport {
                        status: SourceStatus::Failed("processing panicked".to_string()),
                        ..SourceReport::new(source, self.source_dir(source))
                    }
                });
            summary.sources.push(report);
        }

        summary
    }

    /// Process one source end to end.
    #[instrument(skip_all, fields(source = %source.name))]
    pub async fn process_source(&self, source: &SourceDescriptor) -> SourceReport {
        info!(
            "Processing source: {} (Language: {}, Container: {})",
            source.name,
            source.language,
            source.container_preference().unwrap_or("any")
        );

        let dir = self.source_dir(source);
        let mut report = SourceReport::new(source, dir.clone());

        if let SourceKind::Unsupported(kind) = &source.kind {
            warn!("Unsupported source type: {}", kind);
            report.status = SourceStatus::Unsupported(kind.clone());
            return report;
        }

        let videos = match self.enumerate(source).await {
            Ok(videos) => videos,
            Err(e) => {
                error!("Error processing source {}: {}", source.name, e);
                report.status = SourceStatus::Failed(e.to_string());
                return report;
            }
        };
        info!("Found {} videos", videos.len());

        if !self.options.dry_run {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                error!("Cannot create directory {}: {}", dir.display(), e);
                report.status = SourceStatus::Failed(e.to_string());
                return report;
            }
        }

        // Listings are newest first; oldest first keeps file ages in content order.
        for video in videos.iter().rev() {
            let outcome = AssertUnwindSafe(self.process_video(source, &dir, video))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("Processing of video {} panicked", video.url);
                    VideoOutcome::Failed {
                        stage: FailureStage::Panic,
                        message: "processing panicked".to_string(),
                    }
                });
            report.videos.push(VideoReport {
                id: video.id.clone(),
                url: video.url.clone(),
                title: video.title.clone(),
                outcome,
            });
        }

        if self.options.dry_run && !dir.exists() {
            return report;
        }

        match enforce_retention(&dir, source.retention_cap(), self.options.dry_run) {
            Ok(retention) => {
                for failure in &retention.failures {
                    warn!("Could not delete {}: {}", failure.path.display(), failure.message);
                }
                report.retention = Some(retention);
            }
            Err(e) => {
                error!("Retention failed for {}: {}", source.name, e);
                report.status = SourceStatus::Failed(e.to_string());
            }
        }

        report
    }

    /// Resolve the source's video list, newest first, capped at `max_items`.
    async fn enumerate(&self, source: &SourceDescriptor) -> Result<Vec<VideoCandidate>> {
        let mut videos = match &source.kind {
            SourceKind::ChannelHandle => {
                let channel = self.host.resolve_channel(&source.url).await?;
                debug!("Resolved {} to channel {}", channel.handle, channel.id);
                self.host.list_uploads(&channel, source.max_items).await?
            }
            SourceKind::PlaylistUrl => self.host.list_playlist(&source.url, source.max_items).await?,
            SourceKind::Unsupported(kind) => {
                return Err(SynocastError::InvalidInput(format!(
                    "Unsupported source type: {}",
                    kind
                )));
            }
        };

        videos.truncate(source.max_items);
        Ok(videos)
    }

    /// Process one video. Never fails: every fault becomes an outcome.
    #[instrument(skip_all, fields(video = %video.url))]
    pub async fn process_video(
        &self,
        source: &SourceDescriptor,
        dir: &Path,
        video: &VideoCandidate,
    ) -> VideoOutcome {
        match check_duration(video.duration, source.min_duration_secs) {
            DurationVerdict::Keep => {}
            DurationVerdict::Live => {
                info!("Video {} has no duration information (live?). Skipping.", video.url);
                return VideoOutcome::Skipped(SkipReason::Live);
            }
            DurationVerdict::TooShort { duration, minimum } => {
                info!(
                    "Video duration {}s is shorter than minimum {}s. Skipping.",
                    duration.as_secs(),
                    minimum.as_secs()
                );
                return VideoOutcome::Skipped(SkipReason::TooShort { duration, minimum });
            }
        }

        // One deadline covers both requests; yt-dlp serves them from a single dump.
        let fetched = tokio::time::timeout(self.options.manifest_timeout, async {
            let metadata = self
                .host
                .fetch_video(&video.url)
                .await
                .map_err(|e| (FailureStage::Metadata, e))?;
            let streams = self
                .host
                .fetch_audio_streams(&metadata.url)
                .await
                .map_err(|e| (FailureStage::Manifest, e))?;
            Ok::<_, (FailureStage, SynocastError)>((metadata, streams))
        })
        .await;

        let (metadata, streams) = match fetched {
            Ok(Ok(fetched)) => fetched,
            Ok(Err((stage, e))) => {
                warn!("Error processing video {} ({}): {}", video.url, stage, e);
                return VideoOutcome::failed(stage, e);
            }
            Err(_) => {
                let e = SynocastError::ManifestTimeout(self.options.manifest_timeout.as_secs());
                warn!("Processing of video {} was cancelled: {}", video.url, e);
                return VideoOutcome::failed(FailureStage::ManifestTimeout, e);
            }
        };
        info!("Title: {}", metadata.title);
        debug!("Url: {}, duration: {:?}", metadata.url, video.duration);

        let selected = match select_stream(&streams, &source.language, source.container_preference())
        {
            Ok(selected) => selected,
            Err(reason) => {
                info!("{}", reason);
                return VideoOutcome::Skipped(SkipReason::NoStream(reason));
            }
        };
        if selected.language_fallback {
            info!(
                "No audio streams found for language '{}'. Using a stream without language set.",
                source.language
            );
        }
        info!("Best stream: {}", selected.stream);

        let stem = if sanitize_file_name(&metadata.title).is_empty() {
            video.id.as_str()
        } else {
            metadata.title.as_str()
        };
        let path = target_path(dir, stem, &selected.stream.container);

        if path.exists() {
            info!("File already exists: {}. Skipping download.", path.display());
            return VideoOutcome::AlreadyPresent { path };
        }

        if self.options.dry_run {
            info!("Would download to: {}", path.display());
            return VideoOutcome::Planned { path };
        }

        info!("Downloading to: {}", path.display());
        match self.download_to(selected.stream, &path).await {
            Ok(bytes) => {
                info!("Download complete ({} bytes).", bytes);
                VideoOutcome::Downloaded { path, bytes }
            }
            Err(e) => {
                warn!("Error downloading video {}: {}", video.url, e);
                VideoOutcome::failed(FailureStage::Download, e)
            }
        }
    }

    /// Download into a `.part` sibling and rename into place once complete.
    ///
    /// The final path only ever holds a finished download, so a failed or
    /// interrupted transfer is retried on the next run.
    async fn download_to(&self, stream: &AudioStreamOption, path: &Path) -> Result<u64> {
        let mut part = path.as_os_str().to_owned();
        part.push(PARTIAL_SUFFIX);
        let part = PathBuf::from(part);

        let bar = self.progress_bar();
        let on_progress = |fraction: f64| bar.set_position((fraction * 1000.0).round() as u64);

        let result = self.host.download(stream, &part, &on_progress).await;
        bar.finish_and_clear();

        let finished = result.and_then(|bytes| {
            std::fs::rename(&part, path)?;
            Ok(bytes)
        });

        if finished.is_err() && part.exists() {
            if let Err(e) = std::fs::remove_file(&part) {
                warn!("Failed to remove partial download {}: {}", part.display(), e);
            }
        }

        finished
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(1000);
        let style = ProgressStyle::with_template("  [{bar:40.cyan/blue}] {percent:>3}% {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar
    }
}

/// Why a video was not downloaded, without anything having gone wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Live,
    TooShort { duration: Duration, minimum: Duration },
    NoStream(NoStreamReason),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Live => write!(f, "no duration (live?)"),
            SkipReason::TooShort { duration, minimum } => write!(
                f,
                "shorter than {}s ({}s)",
                minimum.as_secs(),
                duration.as_secs()
            ),
            SkipReason::NoStream(reason) => write!(f, "{}", reason),
        }
    }
}

/// Step at which a video failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Metadata,
    Manifest,
    ManifestTimeout,
    Download,
    /// Processing panicked; caught so the source carries on.
    Panic,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Metadata => write!(f, "metadata"),
            FailureStage::Manifest => write!(f, "manifest"),
            FailureStage::ManifestTimeout => write!(f, "manifest timeout"),
            FailureStage::Download => write!(f, "download"),
            FailureStage::Panic => write!(f, "processing"),
        }
    }
}

/// Outcome of processing one video.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    AlreadyPresent { path: PathBuf },
    /// Dry run: would have been downloaded to `path`.
    Planned { path: PathBuf },
    Skipped(SkipReason),
    Failed { stage: FailureStage, message: String },
}

impl VideoOutcome {
    fn failed(stage: FailureStage, error: SynocastError) -> Self {
        VideoOutcome::Failed {
            stage,
            message: error.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, VideoOutcome::Failed { .. })
    }
}

/// One processed video within a source.
#[derive(Debug, Clone)]
pub struct VideoReport {
    pub id: String,
    pub url: String,
    pub title: String,
    pub outcome: VideoOutcome,
}

/// Source-level status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Completed,
    Unsupported(String),
    Failed(String),
}

/// Outcome of processing one source.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub name: String,
    pub directory: PathBuf,
    pub status: SourceStatus,
    pub videos: Vec<VideoReport>,
    pub retention: Option<RetentionReport>,
}

impl SourceReport {
    fn new(source: &SourceDescriptor, directory: PathBuf) -> Self {
        Self {
            name: source.name.clone(),
            directory,
            status: SourceStatus::Completed,
            videos: Vec::new(),
            retention: None,
        }
    }

    fn count(&self, pred: impl Fn(&VideoOutcome) -> bool) -> usize {
        self.videos.iter().filter(|v| pred(&v.outcome)).count()
    }
}

/// Aggregate of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&VideoOutcome) -> bool + Copy) -> usize {
        self.sources.iter().map(|s| s.count(pred)).sum()
    }

    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Downloaded { .. }))
    }

    /// Dry run: videos that would have been downloaded.
    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Planned { .. }))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::AlreadyPresent { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Skipped(_)))
    }

    pub fn failed_videos(&self) -> usize {
        self.count(VideoOutcome::is_failure)
    }

    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.status, SourceStatus::Failed(_)))
            .count()
    }

    pub fn deleted_files(&self) -> usize {
        self.sources
            .iter()
            .filter_map(|s| s.retention.as_ref())
            .map(|r| r.deleted.len())
            .sum()
    }

    /// Any video, source or deletion failed.
    pub fn has_failures(&self) -> bool {
        self.failed_videos() > 0
            || self.failed_sources() > 0
            || self
                .sources
                .iter()
                .filter_map(|s| s.retention.as_ref())
                .any(|r| !r.failures.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ChannelRef, ProgressFn, VideoMetadata};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory host that records what the pipeline asked of it.
    #[derive(Default)]
    struct FakeHost {
        /// Newest first, as a real listing would be.
        videos: Vec<VideoCandidate>,
        streams: HashMap<String, Vec<AudioStreamOption>>,
        slow_metadata: HashSet<String>,
        slow_manifest: HashSet<String>,
        failing_manifest: HashSet<String>,
        failing_download: HashSet<String>,
        panicking_download: HashSet<String>,
        failing_listing: bool,
        resolved: Mutex<Vec<String>>,
        playlists: Mutex<Vec<String>>,
        manifests: Mutex<Vec<String>>,
        downloads: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn with_videos(ids: &[&str]) -> Self {
            Self {
                videos: ids.iter().map(|id| candidate(id, Some(600))).collect(),
                ..Default::default()
            }
        }

        fn calls(list: &Mutex<Vec<String>>) -> Vec<String> {
            list.lock().unwrap().clone()
        }
    }

    fn url(id: &str) -> String {
        format!("https://video.example/{}", id)
    }

    fn candidate(id: &str, secs: Option<u64>) -> VideoCandidate {
        VideoCandidate {
            id: id.to_string(),
            url: url(id),
            title: format!("Title {}", id),
            duration: secs.map(Duration::from_secs),
        }
    }

    fn stream(lang: Option<&str>, container: &str, bitrate: u64) -> AudioStreamOption {
        AudioStreamOption {
            container: container.to_string(),
            bitrate,
            codec: "opus".to_string(),
            language: lang.map(str::to_string),
            is_default_language: true,
            size: Some(5),
            url: format!("https://media.example/{}/{}", container, bitrate),
            headers: BTreeMap::new(),
        }
    }

    #[async_trait]
    impl VideoHost for FakeHost {
        async fn resolve_channel(&self, handle: &str) -> Result<ChannelRef> {
            self.resolved.lock().unwrap().push(handle.to_string());
            Ok(ChannelRef {
                id: "UC123".to_string(),
                handle: handle.to_string(),
                title: None,
            })
        }

        async fn list_uploads(&self, _channel: &ChannelRef, _limit: usize) -> Result<Vec<VideoCandidate>> {
            if self.failing_listing {
                return Err(SynocastError::Host("listing unavailable".to_string()));
            }
            Ok(self.videos.clone())
        }

        async fn list_playlist(&self, url: &str, _limit: usize) -> Result<Vec<VideoCandidate>> {
            self.playlists.lock().unwrap().push(url.to_string());
            if self.failing_listing {
                return Err(SynocastError::Host("listing unavailable".to_string()));
            }
            Ok(self.videos.clone())
        }

        async fn fetch_video(&self, url: &str) -> Result<VideoMetadata> {
            if self.slow_metadata.contains(url) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            let video = self
                .videos
                .iter()
                .find(|v| v.url == url)
                .ok_or_else(|| SynocastError::Host(format!("unknown video {}", url)))?;

            Ok(VideoMetadata {
                id: video.id.clone(),
                url: video.url.clone(),
                title: video.title.clone(),
                duration: video.duration,
                channel: None,
                published_at: None,
            })
        }

        async fn fetch_audio_streams(&self, url: &str) -> Result<Vec<AudioStreamOption>> {
            self.manifests.lock().unwrap().push(url.to_string());
            if self.slow_manifest.contains(url) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            if self.failing_manifest.contains(url) {
                return Err(SynocastError::Manifest("manifest unavailable".to_string()));
            }
            Ok(self
                .streams
                .get(url)
                .cloned()
                .unwrap_or_else(|| vec![stream(Some("en"), "webm", 128)]))
        }

        async fn download(
            &self,
            stream: &AudioStreamOption,
            path: &Path,
            progress: ProgressFn<'_>,
        ) -> Result<u64> {
            self.downloads.lock().unwrap().push(stream.url.clone());
            if self.panicking_download.contains(&stream.url) {
                panic!("decoder blew up on {}", stream.url);
            }
            std::fs::write(path, b"audio")?;
            if self.failing_download.iter().any(|u| path.to_string_lossy().contains(u.as_str())) {
                return Err(SynocastError::Download("connection reset".to_string()));
            }
            progress(1.0);
            Ok(5)
        }
    }

    fn source(kind: SourceKind, name: &str, max_items: usize) -> SourceDescriptor {
        SourceDescriptor {
            kind,
            url: "@channel".to_string(),
            name: name.to_string(),
            max_items,
            language: "en".to_string(),
            container: None,
            max_downloads: None,
            min_duration_secs: Some(60),
        }
    }

    fn orchestrator(host: Arc<FakeHost>, root: &Path) -> Orchestrator {
        let options = RunOptions {
            manifest_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        Orchestrator::new(host, root.to_path_buf(), options)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_processes_oldest_first() {
        let mut host = FakeHost::with_videos(&["c", "b", "a"]);
        for id in ["a", "b", "c"] {
            let mut s = stream(Some("en"), "webm", 128);
            s.url = format!("https://media.example/{}", id);
            host.streams.insert(url(id), vec![s]);
        }
        let host = Arc::new(host);
        let root = TempDir::new().unwrap();

        let report = orchestrator(host.clone(), root.path())
            .process_source(&source(SourceKind::ChannelHandle, "Show", 3))
            .await;

        assert_eq!(report.status, SourceStatus::Completed);
        assert_eq!(
            FakeHost::calls(&host.downloads),
            vec![
                "https://media.example/a",
                "https://media.example/b",
                "https://media.example/c"
            ]
        );
        assert_eq!(FakeHost::calls(&host.resolved), vec!["@channel"]);
        assert_eq!(
            files_in(&root.path().join("Show")),
            vec!["Title a.webm", "Title b.webm", "Title c.webm"]
        );
    }

    #[tokio::test]
    async fn test_second_run_downloads_nothing() {
        let host = Arc::new(FakeHost::with_videos(&["b", "a"]));
        let root = TempDir::new().unwrap();
        let orch = orchestrator(host.clone(), root.path());
        let sources = vec![source(SourceKind::PlaylistUrl, "Show", 5)];

        let first = orch.run(&sources).await;
        assert_eq!(first.downloaded(), 2);

        let second = orch.run(&sources).await;
        assert_eq!(second.downloaded(), 0);
        assert_eq!(second.already_present(), 2);
        assert_eq!(FakeHost::calls(&host.downloads).len(), 2);
        assert_eq!(files_in(&root.path().join("Show")).len(), 2);
    }

    #[tokio::test]
    async fn test_duration_gate_runs_before_manifest() {
        let host = Arc::new(FakeHost {
            videos: vec![
                candidate("live", None),
                candidate("short", Some(59)),
                candidate("exact", Some(60)),
            ],
            ..Default::default()
        });
        let root = TempDir::new().unwrap();

        let report = orchestrator(host.clone(), root.path())
            .process_source(&source(SourceKind::PlaylistUrl, "Show", 5))
            .await;

        let outcomes: HashMap<String, VideoOutcome> =
            report.videos.into_iter().map(|v| (v.id, v.outcome)).collect();
        assert_eq!(outcomes["live"], VideoOutcome::Skipped(SkipReason::Live));
        assert!(matches!(
            outcomes["short"],
            VideoOutcome::Skipped(SkipReason::TooShort { .. })
        ));
        assert!(matches!(outcomes["exact"], VideoOutcome::Downloaded { .. }));
        assert_eq!(FakeHost::calls(&host.manifests), vec![url("exact")]);
    }

    #[tokio::test]
    async fn test_manifest_timeout_skips_only_that_video() {
        let mut host = FakeHost::with_videos(&["c", "slow", "a"]);
        host.slow_manifest.insert(url("slow"));
        let host = Arc::new(host);
        let root = TempDir::new().unwrap();

        let report = orchestrator(host.clone(), root.path())
            .process_source(&source(SourceKind::PlaylistUrl, "Show", 5))
            .await;

        let stages: Vec<Option<FailureStage>> = report
            .videos
            .iter()
            .map(|v| match &v.outcome {
                VideoOutcome::Failed { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![None, Some(FailureStage::ManifestTimeout), None]);
        assert_eq!(files_in(&root.path().join("Show")), vec!["Title a.webm", "Title c.webm"]);
    }

    #[tokio::test]
    async fn test_slow_metadata_counts_against_manifest_timeout() {
        let mut host = FakeHost::with_videos(&["slow", "a"]);
        host.slow_metadata.insert(url("slow"));
        let host = Arc::new(host);
        let root = TempDir::new().unwrap();

        let started = std::time::Instant::now();
        let report = orchestrator(host.clone(), root.path())
            .process_source(&source(SourceKind::PlaylistUrl, "Show", 5))
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(report.videos[0].outcome, VideoOutcome::Downloaded { .. }));
        assert!(matches!(
            report.videos[1].outcome,
            VideoOutcome::Failed { stage: FailureStage::ManifestTimeout, .. }
        ));
        assert_eq!(FakeHost::calls(&host.manifests), vec![url("a")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_manifest_timeout_stops_hung_ytdlp() {
        use crate::host::YtDlpHost;
        use std::os::unix::fs::PermissionsExt;

        let tools = TempDir::new().unwrap();
        let script = tools.path().join("yt-dlp");
        std::fs::write(
            &script,
            "#!/bin/sh\nsleep 5\necho '{\"id\":\"slow\",\"title\":\"T\",\"formats\":[]}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let host = Arc::new(YtDlpHost::with_binary(script.to_string_lossy().into_owned()));
        let root = TempDir::new().unwrap();
        let options = RunOptions {
            manifest_timeout: Duration::from_millis(300),
            dry_run: true,
            ..Default::default()
        };
        let orch = Orchestrator::new(host, root.path().to_path_buf(), options);

        let started = std::time::Instant::now();
        let outcome = orch
            .process_video(
                &source(SourceKind::PlaylistUrl, "Show", 1),
                root.path(),
                &candidate("slow", Some(600)),
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(matches!(
            outcome,
            VideoOutcome::Failed { stage: FailureStage::ManifestTimeout, .. }
        ));
    }

    #[tokio::test]
    async fn test_panicking_video_does_not_stop_source() {
        let mut host = FakeHost::with_videos(&["c", "b", "a"]);
        for id in ["a", "b", "c"] {
            let mut s = stream(Some("en"), "webm", 128);
            s.url = format!("https://media.example/{}", id);
            host.streams.insert(url(id), vec![s]);
        }
        host.panicking_download.insert("https://media.example/b".to_string());
        let host = Arc::new(host);
        let root = TempDir::new().unwrap();
        let mut src = source(SourceKind::PlaylistUrl, "Show", 3);
        src.max_downloads = Some(1);

        let report = orchestrator(host.clone(), root.path()).process_source(&src).await;

        assert_eq!(report.status, SourceStatus::Completed);
        assert_eq!(report.videos.len(), 3);
        assert!(matches!(
            report.videos[1].outcome,
            VideoOutcome::Failed { stage: FailureStage::Panic, .. }
        ));
        assert!(matches!(report.videos[2].outcome, VideoOutcome::Downloaded { .. }));
        assert_eq!(FakeHost::calls(&host.downloads).len(), 3);

        let retention = report.retention.unwrap();
        assert_eq!(retention.deleted, vec![root.path().join("Show").join("Title a.webm")]);
        assert_eq!(files_in(&root.path().join("Show")), vec!["Title c.webm"]);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_video() {
        let mut host = FakeHost::with_videos(&["d", "broken", "nomatch", "a"]);
        host.failing_manifest.insert(url("broken"));
        host.streams.insert(url("nomatch"), vec![stream(Some("de"), "webm", 128)]);
        host.failing_download.insert("Title d".to_string());
        let host = Arc::new(host);
        let root = TempDir::new().unwrap();

        let summary = orchestrator(host, root.path())
            .run(&[source(SourceKind::PlaylistUrl, "Show", 10)])
            .await;

        let outcomes: Vec<&VideoOutcome> =
            summary.sources[0].videos.iter().map(|v| &v.outcome).collect();
        assert!(matches!(outcomes[0], VideoOutcome::Downloaded { .. }));
        assert_eq!(
            outcomes[1],
            &VideoOutcome::Skipped(SkipReason::NoStream(NoStreamReason::NoLanguageMatch {
                language: "en".to_string()
            }))
        );
        assert!(matches!(
            outcomes[2],
            VideoOutcome::Failed { stage: FailureStage::Manifest, .. }
        ));
        assert!(matches!(
            outcomes[3],
            VideoOutcome::Failed { stage: FailureStage::Download, .. }
        ));

        // The failed transfer leaves nothing behind, not even the partial file.
        assert_eq!(files_in(&root.path().join("Show")), vec!["Title a.webm"]);
        assert_eq!(summary.failed_videos(), 2);
        assert!(summary.has_failures());
    }

    #[tokio::test]
    async fn test_retention_removes_oldest_after_downloads() {
        let host = Arc::new(FakeHost::with_videos(&["c", "b", "a"]));
        let root = TempDir::new().unwrap();
        let mut src = source(SourceKind::PlaylistUrl, "Show", 3);
        src.max_downloads = Some(2);

        let report = orchestrator(host, root.path()).process_source(&src).await;

        let retention = report.retention.unwrap();
        assert_eq!(retention.cap, Some(2));
        assert_eq!(retention.deleted, vec![root.path().join("Show").join("Title a.webm")]);
        assert_eq!(files_in(&root.path().join("Show")), vec!["Title b.webm", "Title c.webm"]);
    }

    #[tokio::test]
    async fn test_default_cap_is_twice_max_items() {
        let host = Arc::new(FakeHost::with_videos(&["c", "b", "a"]));
        let root = TempDir::new().unwrap();

        let report = orchestrator(host, root.path())
            .process_source(&source(SourceKind::PlaylistUrl, "Show", 3))
            .await;

        let retention = report.retention.unwrap();
        assert_eq!(retention.cap, Some(6));
        assert!(retention.deleted.is_empty());
        assert_eq!(retention.remaining(), 3);
    }

    #[tokio::test]
    async fn test_listing_is_truncated_to_max_items() {
        let host = Arc::new(FakeHost::with_videos(&["e", "d", "c", "b", "a"]));
        let root = TempDir::new().unwrap();

        let report = orchestrator(host, root.path())
            .process_source(&source(SourceKind::PlaylistUrl, "Show", 2))
            .await;

        let ids: Vec<&str> = report.videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "e"]);
    }

    #[tokio::test]
    async fn test_bad_sources_do_not_stop_the_run() {
        let host = Arc::new(FakeHost::with_videos(&["a"]));
        let failing = Arc::new(FakeHost {
            failing_listing: true,
            ..Default::default()
        });
        let root = TempDir::new().unwrap();

        let unsupported = source(SourceKind::Unsupported("rss".to_string()), "Feed", 3);
        let summary = orchestrator(failing, root.path())
            .run(&[unsupported.clone(), source(SourceKind::PlaylistUrl, "Broken", 3)])
            .await;
        assert_eq!(summary.sources[0].status, SourceStatus::Unsupported("rss".to_string()));
        assert!(matches!(summary.sources[1].status, SourceStatus::Failed(_)));
        assert!(summary.sources[1].retention.is_none());
        assert!(!root.path().join("Broken").exists());

        let summary = orchestrator(host, root.path())
            .run(&[unsupported, source(SourceKind::PlaylistUrl, "Good", 3)])
            .await;
        assert_eq!(summary.sources[1].status, SourceStatus::Completed);
        assert_eq!(summary.downloaded(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let host = Arc::new(FakeHost::with_videos(&["b", "a"]));
        let root = TempDir::new().unwrap();
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let orch = Orchestrator::new(host.clone(), root.path().to_path_buf(), options);

        let summary = orch.run(&[source(SourceKind::PlaylistUrl, "Show", 2)]).await;

        assert_eq!(summary.downloaded(), 0);
        assert_eq!(summary.planned(), 2);
        assert!(matches!(
            summary.sources[0].videos[0].outcome,
            VideoOutcome::Planned { .. }
        ));
        assert!(FakeHost::calls(&host.downloads).is_empty());
        assert!(!root.path().join("Show").exists());
    }

    #[tokio::test]
    async fn test_colliding_titles_share_one_file() {
        let mut host = FakeHost::with_videos(&["b", "a"]);
        host.videos[0].title = "Q&A: part 1".to_string();
        host.videos[1].title = "Q&A? part 1".to_string();
        let host = Arc::new(host);
        let root = TempDir::new().unwrap();

        let report = orchestrator(host, root.path())
            .process_source(&source(SourceKind::PlaylistUrl, "Show", 2))
            .await;

        assert!(matches!(report.videos[0].outcome, VideoOutcome::Downloaded { .. }));
        assert!(matches!(report.videos[1].outcome, VideoOutcome::AlreadyPresent { .. }));
        assert_eq!(files_in(&root.path().join("Show")), vec!["Q&A_ part 1.webm"]);
    }

    #[tokio::test]
    async fn test_empty_title_falls_back_to_video_id() {
        let mut host = FakeHost::with_videos(&["abc123"]);
        host.videos[0].title = String::new();
        let host = Arc::new(host);
        let root = TempDir::new().unwrap();

        orchestrator(host, root.path())
            .process_source(&source(SourceKind::PlaylistUrl, "Show", 1))
            .await;

        assert_eq!(files_in(&root.path().join("Show")), vec!["abc123.webm"]);
    }

    #[tokio::test]
    async fn test_playlist_source_uses_configured_url() {
        let host = Arc::new(FakeHost::with_videos(&["a"]));
        let root = TempDir::new().unwrap();
        let mut src = source(SourceKind::PlaylistUrl, "Show", 1);
        src.url = "https://video.example/playlist?list=PL1".to_string();

        orchestrator(host.clone(), root.path()).process_source(&src).await;

        assert_eq!(FakeHost::calls(&host.playlists), vec![src.url.clone()]);
        assert!(FakeHost::calls(&host.resolved).is_empty());
    }
}
