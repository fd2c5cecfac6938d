//! Audio stream selection by language, container and bitrate.

use crate::host::AudioStreamOption;

/// Why no stream was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoStreamReason {
    /// The video offers no audio-only streams at all.
    NoStreams,
    /// No stream matches the language and none is untagged.
    NoLanguageMatch { language: String },
    /// Streams matched the language, but none uses the requested container.
    NoContainerMatch { language: String, container: String },
}

impl std::fmt::Display for NoStreamReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoStreamReason::NoStreams => write!(f, "no audio-only streams available"),
            NoStreamReason::NoLanguageMatch { language } => {
                write!(f, "no audio stream for language '{}' and no untagged stream", language)
            }
            NoStreamReason::NoContainerMatch { language, container } => write!(
                f,
                "no audio stream found for language '{}' and container '{}'",
                language, container
            ),
        }
    }
}

/// A chosen stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedStream<'a> {
    pub stream: &'a AudioStreamOption,
    /// True when no stream matched the language and an untagged one was used.
    pub language_fallback: bool,
}

pub type Selection<'a> = std::result::Result<SelectedStream<'a>, NoStreamReason>;

/// `code` equals `language` or is a region variant of it (`en` / `en-US`).
fn matches_language(code: &str, language: &str) -> bool {
    if code.eq_ignore_ascii_case(language) {
        return true;
    }
    code.len() > language.len() + 1
        && code.is_char_boundary(language.len())
        && code[..language.len()].eq_ignore_ascii_case(language)
        && code.as_bytes()[language.len()] == b'-'
}

/// Pick the best audio stream.
///
/// Streams in the requested language (or a region variant) are preferred;
/// untagged streams are the fallback when none match. The container filter
/// is applied to that set only and has no fallback of its own. The highest
/// bitrate wins, with the first of equal bitrates kept.
pub fn select_stream<'a>(
    streams: &'a [AudioStreamOption],
    language: &str,
    container: Option<&str>,
) -> Selection<'a> {
    if streams.is_empty() {
        return Err(NoStreamReason::NoStreams);
    }

    let language = language.trim();
    let mut candidates: Vec<&AudioStreamOption> = streams
        .iter()
        .filter(|s| s.language_code().is_some_and(|code| matches_language(code, language)))
        .collect();

    let language_fallback = candidates.is_empty();
    if language_fallback {
        candidates = streams.iter().filter(|s| s.language_code().is_none()).collect();
    }

    if candidates.is_empty() {
        return Err(NoStreamReason::NoLanguageMatch {
            language: language.to_string(),
        });
    }

    if let Some(container) = container.map(str::trim).filter(|c| !c.is_empty()) {
        candidates.retain(|s| s.container.eq_ignore_ascii_case(container));
        if candidates.is_empty() {
            return Err(NoStreamReason::NoContainerMatch {
                language: language.to_string(),
                container: container.to_string(),
            });
        }
    }

    candidates
        .into_iter()
        .reduce(|best, s| if s.bitrate > best.bitrate { s } else { best })
        .map(|stream| SelectedStream {
            stream,
            language_fallback,
        })
        .ok_or(NoStreamReason::NoStreams)
}
