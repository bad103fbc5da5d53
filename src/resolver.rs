use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, instrument};

use crate::types::FileReference;

/// Extensions that make a bare token (one without a path separator) a
/// file-path candidate.
const KNOWN_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "java", "c", "h", "cpp", "hpp", "cc", "go", "rb", "php",
    "cs", "swift", "kt", "scala", "sh", "bash", "html", "css", "scss", "json", "yaml", "yml",
    "toml", "xml", "md", "txt", "sql", "ini", "cfg", "conf", "csv", "lock", "env",
];

/// Quote, bracket, and sentence punctuation stripped from token edges before
/// matching.
const TRIM_CHARS: &[char] = &[
    '"', '\'', '`', '(', ')', '[', ']', '{', '}', '<', '>', ',', ';', ':', '!', '?', '*',
];

/// Extracts file-path candidates from free-form text and resolves each
/// against the project root.
///
/// Tokens are whitespace-delimited; a token qualifies when it contains a
/// path separator or ends in a known source-file extension. Duplicates are
/// removed while preserving first-seen order. Candidates that do not exist
/// on disk are reported with `exists == false` rather than dropped.
#[instrument(skip(root, text), fields(root = %root.display(), text_length = text.len()))]
pub fn resolve_references(root: &Path, text: &str) -> Vec<FileReference> {
    let mut references = Vec::new();
    let mut seen = HashSet::new();

    for token in text.split_whitespace() {
        let Some(candidate) = clean_token(token) else {
            continue;
        };
        if !is_path_candidate(&candidate) {
            continue;
        }
        if !seen.insert(candidate.clone()) {
            continue;
        }

        let exists = root.join(&candidate).is_file();
        references.push(FileReference {
            path: candidate,
            exists,
        });
    }

    debug!(reference_count = references.len(), "References resolved");
    references
}

fn clean_token(token: &str) -> Option<String> {
    let trimmed = token
        .trim_matches(TRIM_CHARS)
        .trim_end_matches('.')
        .replace('\\', "/");

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn is_path_candidate(token: &str) -> bool {
    // URLs contain separators but never name project files.
    if token.contains("://") {
        return false;
    }
    if token.contains('/') {
        return true;
    }

    Path::new(token)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| KNOWN_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}
