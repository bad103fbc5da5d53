use std::fmt::Display;
use std::fs;
use std::path::Path;

use crate::types::FileReference;

/// Language hint for a fenced block: the lowercased file extension, or an
/// empty tag when the file has none.
pub fn language_hint(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// Formats a single file as a `# <path>` header followed by a fenced code
/// block. Content always ends with a newline before the closing fence.
pub fn format_file_block(path: &str, content: &str) -> String {
    let mut block = format!("# {}\n```{}\n", path, language_hint(path));
    block.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        block.push('\n');
    }
    block.push_str("```");
    block
}

fn format_error_block(path: &str, error: &dyn Display) -> String {
    format!("# ERROR: Could not read {path}\n```\n{error}\n```")
}

/// Assembles the clipboard payload for a set of resolved references.
///
/// Existing files are read from disk and emitted in full; files still to be
/// created become placeholder blocks with empty content. A file that exists
/// but cannot be read yields an error block instead of aborting the payload.
pub fn format_references(root: &Path, references: &[FileReference]) -> String {
    let blocks: Vec<String> = references
        .iter()
        .map(|reference| {
            if reference.exists {
                match fs::read_to_string(root.join(&reference.path)) {
                    Ok(content) => format_file_block(&reference.path, &content),
                    Err(e) => format_error_block(&reference.path, &e),
                }
            } else {
                format_file_block(&reference.path, "")
            }
        })
        .collect();

    blocks.join("\n\n")
}
