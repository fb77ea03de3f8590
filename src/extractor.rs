use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ExtractError;

/// Characters stripped from both ends of an extracted token.
const PUNCTUATION: &[char] = &['.', ',', '!', '?', '(', ')', '[', ']', '{', '}', '"', ':', ';'];

/// Reads every `{prefix}*.txt` file in `dir` and returns the candidate words in
/// file-then-line order. Duplicates are kept.
///
/// Unreadable files are skipped with a warning. Only a failure to list `dir`
/// itself is an error.
pub fn extract_words(dir: &Path, prefix: &str) -> Result<Vec<String>, ExtractError> {
    let entries = fs::read_dir(dir).map_err(|source| ExtractError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    // Sorted so repeated runs visit files in the same order.
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| name.starts_with(prefix) && name.ends_with(".txt"))
        })
        .collect();
    paths.sort();

    let mut words = Vec::new();
    for path in paths {
        match fs::read_to_string(&path) {
            Ok(content) => {
                let before = words.len();
                words.extend(content.lines().filter_map(extract_token));
                debug!(file = %path.display(), extracted = words.len() - before, "Read word file");
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Error reading word file, skipping");
            }
        }
    }

    Ok(words)
}

/// Pulls the candidate word out of a single line, if it has one.
///
/// The token is whatever follows the last `", "` delimiter, with surrounding
/// whitespace and punctuation removed. It must be a single non-empty word.
pub fn extract_token(line: &str) -> Option<String> {
    let line = line.trim();
    if !line.contains(',') {
        return None;
    }

    let last = line.rsplit(", ").next().unwrap_or(line).trim();
    let cleaned = last.trim_matches(PUNCTUATION);

    if cleaned.is_empty() || cleaned.chars().any(char::is_whitespace) {
        return None;
    }
    Some(cleaned.to_string())
}
