//! Check command implementation.

use crate::cli::Output;
use crate::config::{Settings, SourceKind};
use anyhow::{Context, Result};

/// Load and validate the configuration, then show what each source resolves to.
pub fn run_check(config: Option<&str>) -> Result<()> {
    let config_path = Settings::resolve_config_path(config);
    let settings = Settings::load_from(&config_path).with_context(|| {
        format!("Failed to load configuration file: {}", config_path.display())
    })?;

    Output::success(&format!("Configuration OK: {}", config_path.display()));
    Output::kv("Output root", &settings.output_root().display().to_string());
    Output::kv(
        "Manifest timeout",
        &format!("{}s", settings.manifest_timeout_secs),
    );

    for source in &settings.sources {
        Output::header(&source.name);
        Output::kv("Type", &source.kind.to_string());
        if let SourceKind::Unsupported(kind) = &source.kind {
            Output::warning(&format!("Unsupported source type '{}'; this source will be skipped", kind));
        }
        Output::kv("Url", &source.url);
        Output::kv("Language", &source.language);
        Output::kv("Container", source.container_preference().unwrap_or("any"));
        Output::kv("Max items", &source.max_items.to_string());
        Output::kv(
            "Retention cap",
            &source
                .retention_cap()
                .map(|cap| cap.to_string())
                .unwrap_or_else(|| "disabled".to_string()),
        );
        Output::kv(
            "Min duration",
            &source
                .min_duration_secs
                .map(|secs| format!("{}s", secs))
                .unwrap_or_else(|| "none".to_string()),
        );
        Output::kv("Directory", &settings.source_dir(source).display().to_string());
    }

    Ok(())
}
