//! Filesystem-safe names for source directories and downloaded files.

use std::path::{Path, PathBuf};

/// Character substituted for every invalid character.
pub const REPLACEMENT_CHAR: char = '_';

/// Printable characters that are invalid in file names on at least one common platform.
///
/// NUL and the C0 controls `0x01..=0x1F` are invalid as well.
pub const INVALID_FILE_NAME_CHARS: &[char] = &['"', '<', '>', '|', ':', '*', '?', '\\', '/'];

fn is_invalid(c: char) -> bool {
    c <= '\u{1f}' || INVALID_FILE_NAME_CHARS.contains(&c)
}

/// Replace each invalid character with `_`.
///
/// Deterministic and idempotent. A title made only of invalid characters
/// becomes a string of underscores; an empty title stays empty.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if is_invalid(c) { REPLACEMENT_CHAR } else { c })
        .collect()
}

/// Destination `<dir>/<sanitized stem>.<sanitized extension>`.
pub fn target_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    dir.join(format!(
        "{}.{}",
        sanitize_file_name(stem),
        sanitize_file_name(extension)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_invalid_characters() {
        assert_eq!(
            sanitize_file_name("Episode 12: \"Why?\" <live> a/b\\c|d*e"),
            "Episode 12_ _Why__ _live_ a_b_c_d_e"
        );
        assert_eq!(sanitize_file_name("tab\there\nnul\0"), "tab_here_nul_");
    }

    #[test]
    fn test_keeps_valid_text() {
        assert_eq!(sanitize_file_name("Café – Épisode #3 (2024)"), "Café – Épisode #3 (2024)");
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize_file_name("a:b?c");
        assert_eq!(sanitize_file_name(&once), once);
    }

    #[test]
    fn test_only_invalid_characters() {
        assert_eq!(sanitize_file_name(":?*"), "___");
        assert_eq!(sanitize_file_name(""), "");
    }

    #[test]
    fn test_target_path() {
        let path = target_path(Path::new("/data/Show"), "Part 1/2", "webm");
        assert_eq!(path, PathBuf::from("/data/Show/Part 1_2.webm"));
    }
}
