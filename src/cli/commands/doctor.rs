//! Doctor command - verify system requirements and configuration.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(config: Option<&str>, ytdlp: &str) -> anyhow::Result<()> {
    Output::header("Synocast Doctor");
    println!();

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let tool = check_ytdlp(ytdlp);
    tool.print();
    checks.push(tool);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = check_config(config);
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!("{} error(s) found.", errors));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Synocast is ready to use.");
    }

    Ok(())
}

fn check_ytdlp(binary: &str) -> CheckResult {
    match preflight::check_tool(binary) {
        Ok(version) => CheckResult::ok("yt-dlp", &version),
        Err(e) => CheckResult::error("yt-dlp", &e.to_string(), install_hint_ytdlp()),
    }
}

/// Check that the config loads and that its output root is usable.
fn check_config(config: Option<&str>) -> Vec<CheckResult> {
    let path = Settings::resolve_config_path(config);

    let settings = match Settings::load_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            return vec![CheckResult::error(
                "Config file",
                &format!("{}: {}", path.display(), e),
                "Pass the config path explicitly: synocast doctor <config>",
            )];
        }
    };

    let mut results = vec![CheckResult::ok(
        "Config file",
        &format!("{} ({} sources)", path.display(), settings.sources.len()),
    )];

    let root = settings.output_root();
    if root.is_dir() {
        results.push(CheckResult::ok("Output root", &root.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Output root",
            &format!("{} (does not exist yet)", root.display()),
            "Source directories are created on the first run",
        ));
    }

    results
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}
