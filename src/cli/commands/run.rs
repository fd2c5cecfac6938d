//! Run command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::host::YtDlpHost;
use crate::orchestrator::Orchestrator;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Mirror every configured source.
///
/// Only a configuration failure is fatal. Per-video and per-source problems
/// are reported, and turn into an error only with `strict`.
pub async fn run_sources(
    config: Option<&str>,
    output_dir: Option<String>,
    dry_run: bool,
    strict: bool,
    ytdlp: &str,
) -> Result<()> {
    let config_path = Settings::resolve_config_path(config);
    let mut settings = Settings::load_from(&config_path).with_context(|| {
        format!("Failed to load configuration file: {}", config_path.display())
    })?;

    if let Some(dir) = output_dir {
        settings.output_directory = Some(dir);
    }

    if let Err(e) = preflight::check_tool(ytdlp) {
        Output::warning(&e.to_string());
        Output::info("Run 'synocast doctor' for detailed diagnostics.");
    }

    Output::info(&format!(
        "Mirroring {} source(s) into {}{}",
        settings.sources.len(),
        settings.output_root().display(),
        if dry_run { " (dry run)" } else { "" }
    ));

    let host = Arc::new(YtDlpHost::with_binary(ytdlp));
    let orchestrator = Orchestrator::from_settings(&settings, host, dry_run);
    let summary = orchestrator.run(&settings.sources).await;

    for report in &summary.sources {
        Output::source_report(report);
    }
    Output::run_summary(&summary);

    if strict && summary.has_failures() {
        anyhow::bail!("run completed with failures");
    }

    Ok(())
}
