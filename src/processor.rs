use crate::error::Result;
use crate::format;
use crate::resolver;
use crate::scanner;
use crate::state::{self, ProjectState};
use crate::types::{FileBlock, FileChange, FileReference, FileStatus, SmartPaste};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Drives the copy, smart-paste, and apply operations for one project root.
///
/// Holds the persisted selection and content snapshot; every mutating
/// operation refreshes the snapshot and saves it immediately.
pub struct ClipChangesProcessor {
    root: PathBuf,
    state_path: PathBuf,
    state: ProjectState,
}

impl ClipChangesProcessor {
    /// Create a processor for a project root, using the default state file
    /// location beside the program binary
    #[instrument(skip(root), fields(root = %root.display()))]
    pub fn new_from_root(root: &Path) -> Result<Self> {
        Self::new_with_state_path(root, &state::default_state_path())
    }

    /// Create a processor with an explicit state file location
    #[instrument(skip(root, state_path), fields(root = %root.display(), state_path = %state_path.display()))]
    pub fn new_with_state_path(root: &Path, state_path: &Path) -> Result<Self> {
        let root = fs::canonicalize(root)?;
        let state = ProjectState::load(state_path, &root)?;

        debug!(
            root = %root.display(),
            selected = state.selected_files.len(),
            "Processor created"
        );

        Ok(Self {
            root,
            state_path: state_path.to_path_buf(),
            state,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The persisted file selection for this project
    #[must_use]
    pub fn selection(&self) -> &[String] {
        &self.state.selected_files
    }

    /// Lists every selectable text file under the project root.
    ///
    /// # Errors
    ///
    /// Returns an error if the project tree cannot be read.
    pub fn scan_project(&self) -> Result<Vec<String>> {
        scanner::scan_project(&self.root)
    }

    /// Resolves file references mentioned in free-form text against the
    /// project root. Order follows first mention; duplicates are dropped.
    #[must_use]
    pub fn resolve_references(&self, text: &str) -> Vec<FileReference> {
        resolver::resolve_references(&self.root, text)
    }

    /// Smart Paster: resolves file references from `text` and assembles the
    /// formatted payload. Existing files are emitted in full, missing ones
    /// as empty placeholder blocks. The resolved existing files become the
    /// new selection and their hashes the new snapshot baseline.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be saved.
    #[instrument(skip(self, text), fields(text_length = text.len()))]
    pub fn smart_paste(&mut self, text: &str) -> Result<SmartPaste> {
        let references = self.resolve_references(text);
        let payload = format::format_references(&self.root, &references);

        self.record_selection(&references)?;

        debug!(
            reference_count = references.len(),
            payload_length = payload.len(),
            "Smart paste assembled"
        );
        Ok(SmartPaste {
            references,
            payload,
        })
    }

    /// Formats the stored selection into the clipboard payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected directory cannot be read or the state
    /// file cannot be saved.
    pub fn pack_selection(&mut self) -> Result<String> {
        let selection = self.state.selected_files.clone();
        self.pack_files(&selection)
    }

    /// Formats the given selection entries into the clipboard payload.
    /// Directory entries expand recursively to the text files beneath them.
    /// The expanded list replaces the stored selection and refreshes the
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected directory cannot be read or the state
    /// file cannot be saved.
    #[instrument(skip(self, entries), fields(entry_count = entries.len()))]
    pub fn pack_files(&mut self, entries: &[String]) -> Result<String> {
        let expanded = scanner::expand_selection(&self.root, entries)?;
        let references: Vec<FileReference> = expanded
            .iter()
            .map(|path| FileReference {
                path: path.clone(),
                exists: self.root.join(path).is_file(),
            })
            .collect();
        let payload = format::format_references(&self.root, &references);

        self.record_selection(&references)?;

        debug!(
            file_count = references.len(),
            payload_length = payload.len(),
            "Selection packed"
        );
        Ok(payload)
    }

    /// Parses block-structured text into file blocks.
    ///
    /// A block is a `# <path>` header line followed (blank lines permitted)
    /// by a fenced code section; the fence language tag is ignored and
    /// `# ERROR:` headers emitted by the formatter are skipped. Prose
    /// outside blocks is ignored. Duplicate paths are preserved here;
    /// `apply_changes` collapses them last-wins.
    #[must_use]
    pub fn parse_blocks(text: &str) -> Vec<FileBlock> {
        let lines: Vec<&str> = text.lines().collect();
        let mut blocks = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let Some(header) = lines[i].strip_prefix("# ") else {
                i += 1;
                continue;
            };
            let path = header.trim();
            if path.is_empty() || path.starts_with("ERROR:") {
                i += 1;
                continue;
            }

            // Locate the opening fence for this header.
            let mut j = i + 1;
            while j < lines.len() && lines[j].trim().is_empty() {
                j += 1;
            }
            if j >= lines.len() || !lines[j].starts_with("```") {
                i += 1;
                continue;
            }

            // Gather content up to the closing fence. A header whose fence
            // never closes is ignored.
            let mut k = j + 1;
            let mut closed = false;
            while k < lines.len() {
                if lines[k].trim_end() == "```" {
                    closed = true;
                    break;
                }
                k += 1;
            }
            if !closed {
                i += 1;
                continue;
            }

            let mut content = lines[j + 1..k].join("\n");
            if !content.is_empty() {
                content.push('\n');
            }
            blocks.push(FileBlock {
                path: path.replace('\\', "/"),
                content,
            });
            i = k + 1;
        }

        blocks
    }

    /// Classifies the file blocks in `text` against the current snapshot
    /// without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Currently infallible; fallible for parity with `apply_changes`.
    #[instrument(skip(self, text))]
    pub fn preview_changes(&self, text: &str) -> Result<HashMap<String, FileChange>> {
        let blocks = Self::dedupe_last_wins(Self::parse_blocks(text));
        debug!(block_count = blocks.len(), "Previewing file blocks");

        let mut changes = HashMap::with_capacity(blocks.len());
        for block in blocks {
            if !Self::is_safe_relative(&block.path) {
                warn!(path = %block.path, "Skipping block with unsafe path");
                continue;
            }
            let status = self.classify(&block.path, &block.content);
            changes.insert(
                block.path.clone(),
                FileChange {
                    path: block.path,
                    status,
                },
            );
        }
        Ok(changes)
    }

    /// Applies the file blocks in `text` to disk: each block's content is
    /// written under the project root, creating parent directories as
    /// needed, and reported as Created, Modified, or Unmodified relative to
    /// the prior snapshot. Duplicate paths collapse last-wins to a single
    /// write. The snapshot is updated and saved afterwards.
    ///
    /// There is no rollback: blocks written before a failing write stay on
    /// disk.
    ///
    /// # Errors
    ///
    /// Returns an error if a write fails or the state file cannot be saved.
    #[instrument(skip(self, text), fields(text_length = text.len()))]
    pub fn apply_changes(&mut self, text: &str) -> Result<HashMap<String, FileChange>> {
        let blocks = Self::dedupe_last_wins(Self::parse_blocks(text));
        debug!(block_count = blocks.len(), "Applying file blocks");

        let mut changes = HashMap::with_capacity(blocks.len());
        for block in blocks {
            if !Self::is_safe_relative(&block.path) {
                warn!(path = %block.path, "Skipping block with unsafe path");
                continue;
            }

            let status = self.classify(&block.path, &block.content);
            let target_path = self.root.join(&block.path);
            if let Some(parent_dir) = target_path.parent() {
                if !parent_dir.exists() {
                    debug!(parent_dir = %parent_dir.display(), "Creating parent directory");
                    fs::create_dir_all(parent_dir)?;
                }
            }
            fs::write(&target_path, &block.content)?;

            debug!(path = %block.path, status = ?status, "File block applied");
            self.state
                .file_hashes
                .insert(block.path.clone(), state::sha256_hex(&block.content));
            changes.insert(
                block.path.clone(),
                FileChange {
                    path: block.path,
                    status,
                },
            );
        }

        self.state.save(&self.state_path)?;
        Ok(changes)
    }

    /// Created when the path is absent on disk before the write. For
    /// present files the snapshot hash is authoritative; first contact with
    /// a file falls back to hashing its current content.
    fn classify(&self, path: &str, new_content: &str) -> FileStatus {
        let target_path = self.root.join(path);
        if !target_path.exists() {
            return FileStatus::Created;
        }

        let new_hash = state::sha256_hex(new_content);
        let prior_hash = self.state.file_hashes.get(path).cloned().or_else(|| {
            fs::read_to_string(&target_path)
                .ok()
                .map(|content| state::sha256_hex(&content))
        });

        match prior_hash {
            Some(prior) if prior == new_hash => FileStatus::Unmodified,
            _ => FileStatus::Modified,
        }
    }

    fn dedupe_last_wins(blocks: Vec<FileBlock>) -> Vec<FileBlock> {
        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, String> = HashMap::new();

        for block in blocks {
            if !latest.contains_key(&block.path) {
                order.push(block.path.clone());
            }
            latest.insert(block.path, block.content);
        }

        order
            .into_iter()
            .filter_map(|path| {
                latest
                    .remove(&path)
                    .map(|content| FileBlock { path, content })
            })
            .collect()
    }

    // Applied paths must stay inside the project root.
    fn is_safe_relative(path: &str) -> bool {
        let path = Path::new(path);
        if path.is_absolute() {
            return false;
        }
        !path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    }

    fn record_selection(&mut self, references: &[FileReference]) -> Result<()> {
        self.state.selected_files = references
            .iter()
            .filter(|reference| reference.exists)
            .map(|reference| reference.path.clone())
            .collect();

        for reference in references.iter().filter(|reference| reference.exists) {
            if let Ok(content) = fs::read_to_string(self.root.join(&reference.path)) {
                self.state
                    .file_hashes
                    .insert(reference.path.clone(), state::sha256_hex(&content));
            }
        }

        self.state.save(&self.state_path)
    }
}
