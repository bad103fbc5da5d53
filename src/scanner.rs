use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// Directories never descended into when scanning a project
const IGNORE_DIRS: &[&str] = &[
    "__pycache__",
    "node_modules",
    "venv",
    "dist",
    "build",
    "target",
    ".git",
    ".idea",
    ".vscode",
];

/// Files never offered for selection
const IGNORE_FILES: &[&str] = &[".DS_Store", crate::state::STATE_FILENAME];

/// Lists every selectable text file under the project root, as `/`-separated
/// paths relative to the root, sorted case-insensitively.
///
/// # Errors
///
/// Returns an error if a directory in the tree cannot be read.
#[instrument(skip(root), fields(root = %root.display()))]
pub fn scan_project(root: &Path) -> Result<Vec<String>> {
    let mut files = collect_files(root, root)?;
    files.sort_by_key(|path| path.to_lowercase());

    debug!(file_count = files.len(), "Project scan completed");
    Ok(files)
}

/// Expands a selection so that directory entries become the text files
/// beneath them, keeping plain file entries as-is. Duplicates are removed
/// while preserving first-seen order.
///
/// # Errors
///
/// Returns an error if a selected directory cannot be read.
pub fn expand_selection(root: &Path, entries: &[String]) -> Result<Vec<String>> {
    let mut expanded = Vec::new();
    let mut seen = HashSet::new();

    for entry in entries {
        let normalized = entry.replace('\\', "/");
        let full_path = root.join(&normalized);

        if full_path.is_dir() {
            let mut nested = collect_files(root, &full_path)?;
            nested.sort_by_key(|path| path.to_lowercase());
            for path in nested {
                if seen.insert(path.clone()) {
                    expanded.push(path);
                }
            }
        } else if seen.insert(normalized.clone()) {
            expanded.push(normalized);
        }
    }

    Ok(expanded)
}

fn collect_files(root: &Path, start: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(start).into_iter().filter_entry(keep_entry) {
        let entry = entry.map_err(|e| Error::ScanError(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if IGNORE_FILES.contains(&name.as_ref()) {
            continue;
        }
        if !is_text_file(entry.path()) {
            continue;
        }

        if let Ok(rel_path) = entry.path().strip_prefix(root) {
            files.push(rel_path.to_string_lossy().replace('\\', "/"));
        }
    }

    Ok(files)
}

// The walk root itself is always kept, so scanning "." or a hidden
// working directory still descends into it.
fn keep_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }

    let Some(name) = entry.file_name().to_str() else {
        return false;
    };

    if name.starts_with('.') {
        return false;
    }
    if entry.file_type().is_dir() && IGNORE_DIRS.contains(&name) {
        return false;
    }

    true
}

/// A file counts as text when its first 1024 bytes contain no NUL byte.
/// Unreadable files are treated as binary and skipped.
fn is_text_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };

    let mut chunk = [0u8; 1024];
    match file.read(&mut chunk) {
        Ok(n) => !chunk[..n].contains(&0),
        Err(_) => false,
    }
}
