pub use clipboard::{publish_payload, Clipboard, SystemClipboard};
pub use error::{Error, Result};
pub use state::default_state_path;
pub use types::{FileBlock, FileChange, FileReference, FileStatus, SmartPaste};

use std::path::Path;

mod clipboard;
mod error;
mod format;
pub mod processor;
mod resolver;
mod scanner;
mod state;
mod types;

/// Creates a new `ClipChangesProcessor` for a project root, with the state
/// file at its default location beside the program binary.
///
/// # Arguments
///
/// * `root`: The project directory that selections, references, and applied
///   file blocks are resolved against.
///
/// # Errors
///
/// Returns an error if the root directory cannot be canonicalized.
pub fn new(root: &Path) -> Result<processor::ClipChangesProcessor> {
    processor::ClipChangesProcessor::new_from_root(root)
}

/// Creates a new `ClipChangesProcessor` with an explicit state file path.
/// State recorded for a different project directory is discarded on load.
///
/// # Errors
///
/// Returns an error if the root directory cannot be canonicalized.
pub fn new_with_state_path(
    root: &Path,
    state_path: &Path,
) -> Result<processor::ClipChangesProcessor> {
    processor::ClipChangesProcessor::new_with_state_path(root, state_path)
}
