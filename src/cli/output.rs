//! CLI output formatting utilities.

use crate::orchestrator::{RunSummary, SourceReport, SourceStatus, VideoOutcome};
use console::style;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print the program banner with version and build target.
    pub fn banner() {
        eprintln!(
            "{} {} ({}-{})",
            style("synocast").bold(),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::ARCH,
            std::env::consts::OS
        );
    }

    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print everything that happened to one source.
    pub fn source_report(report: &SourceReport) {
        Output::header(&report.name);

        match &report.status {
            SourceStatus::Completed => {}
            SourceStatus::Unsupported(kind) => {
                Output::warning(&format!("Skipped: unsupported source type '{}'", kind));
            }
            SourceStatus::Failed(message) => Output::error(&format!("Failed: {}", message)),
        }

        for video in &report.videos {
            println!("  {} {}", outcome_marker(&video.outcome), video.title);
            println!("      {}", style(outcome_text(&video.outcome)).dim());
        }

        if let Some(retention) = &report.retention {
            let verb = if retention.dry_run { "would delete" } else { "deleted" };
            for path in &retention.deleted {
                Output::list_item(&format!("{} {}", verb, path.display()));
            }
            for failure in &retention.failures {
                Output::error(&format!(
                    "Failed to delete {}: {}",
                    failure.path.display(),
                    failure.message
                ));
            }
            let cap = retention
                .cap
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unlimited".to_string());
            Output::kv("Files", &format!("{} (cap {})", retention.remaining(), cap));
        }
    }

    /// Print the totals of a run.
    pub fn run_summary(summary: &RunSummary) {
        println!();
        Output::info(&format!("Run complete: {}", summary_line(summary)));
        if summary.failed_sources() > 0 {
            Output::warning(&format!("{} source(s) failed", summary.failed_sources()));
        }
    }
}

fn summary_line(summary: &RunSummary) -> String {
    let transferred = if summary.planned() > 0 {
        format!("{} would be downloaded", summary.planned())
    } else {
        format!("{} downloaded", summary.downloaded())
    };
    format!(
        "{}, {} already present, {} skipped, {} failed, {} deleted",
        transferred,
        summary.already_present(),
        summary.skipped(),
        summary.failed_videos(),
        summary.deleted_files()
    )
}

fn outcome_marker(outcome: &VideoOutcome) -> console::StyledObject<&'static str> {
    match outcome {
        VideoOutcome::Downloaded { .. } | VideoOutcome::Planned { .. } => style("+").green(),
        VideoOutcome::AlreadyPresent { .. } => style("=").dim(),
        VideoOutcome::Skipped(_) => style("-").yellow(),
        VideoOutcome::Failed { .. } => style("!").red(),
    }
}

fn outcome_text(outcome: &VideoOutcome) -> String {
    match outcome {
        VideoOutcome::Downloaded { path, bytes } => {
            format!("downloaded {} ({})", path.display(), format_size(*bytes))
        }
        VideoOutcome::AlreadyPresent { path } => format!("already present at {}", path.display()),
        VideoOutcome::Planned { path } => format!("would download to {}", path.display()),
        VideoOutcome::Skipped(reason) => format!("skipped: {}", reason),
        VideoOutcome::Failed { stage, message } => format!("{} failed: {}", stage, message),
    }
}

/// Format file size in human-readable format.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
