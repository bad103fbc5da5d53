use clip_changes::processor::ClipChangesProcessor;
use clip_changes::{self, FileStatus};
use std::fs;
use std::path::PathBuf;
use tree_fs::{Tree, TreeBuilder};

fn setup_project() -> (Tree, Tree) {
    // A small project tree plus a scratch directory for the state file
    let project_tree = TreeBuilder::default()
        .add_file("main.py", "print('hello')\n")
        .add_file("src/lib.rs", "pub fn answer() -> u32 {\n    42\n}\n")
        .add_file("README.md", "# demo project\n")
        .create()
        .expect("Failed to create project tree");

    let scratch_tree = TreeBuilder::default()
        .create()
        .expect("Failed to create scratch tree");

    (project_tree, scratch_tree)
}

fn state_path(scratch_tree: &Tree) -> PathBuf {
    scratch_tree.root.join("state.json")
}

#[test]
fn test_apply_creates_files_with_exact_content() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let response = "\
Here are the new files:

# src/new_module.rs
```rs
pub fn created() {}
```

# docs/notes.md
```md
some notes
```
";

    let changes = processor
        .apply_changes(response)
        .expect("Failed to apply changes");

    assert_eq!(changes.len(), 2, "Should have 2 applied files");
    assert_eq!(
        fs::read_to_string(project_tree.root.join("src/new_module.rs"))
            .expect("Failed to read new_module.rs"),
        "pub fn created() {}\n"
    );
    assert_eq!(
        fs::read_to_string(project_tree.root.join("docs/notes.md"))
            .expect("Failed to read notes.md"),
        "some notes\n"
    );

    let module_change = changes
        .get("src/new_module.rs")
        .expect("src/new_module.rs should be in changes");
    assert!(matches!(module_change.status, FileStatus::Created));
    let notes_change = changes
        .get("docs/notes.md")
        .expect("docs/notes.md should be in changes");
    assert!(matches!(notes_change.status, FileStatus::Created));
}

#[test]
fn test_apply_classifies_against_snapshot() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    // Publishing the file records its hash as the snapshot baseline.
    processor
        .pack_files(&["main.py".to_string()])
        .expect("Failed to pack main.py");

    let unchanged = "# main.py\n```py\nprint('hello')\n```";
    let changes = processor
        .apply_changes(unchanged)
        .expect("Failed to apply unchanged block");
    let change = changes.get("main.py").expect("main.py should be in changes");
    assert!(matches!(change.status, FileStatus::Unmodified));

    let modified = "# main.py\n```py\nprint('goodbye')\n```";
    let changes = processor
        .apply_changes(modified)
        .expect("Failed to apply modified block");
    let change = changes.get("main.py").expect("main.py should be in changes");
    assert!(matches!(change.status, FileStatus::Modified));
    assert_eq!(
        fs::read_to_string(project_tree.root.join("main.py")).expect("Failed to read main.py"),
        "print('goodbye')\n"
    );

    // The apply refreshed the snapshot, so replaying the same block is a no-op.
    let changes = processor
        .apply_changes(modified)
        .expect("Failed to re-apply block");
    let change = changes.get("main.py").expect("main.py should be in changes");
    assert!(matches!(change.status, FileStatus::Unmodified));
}

#[test]
fn test_apply_without_snapshot_falls_back_to_disk_content() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    // No pack has run, so the snapshot has no entry for README.md.
    let unchanged = "# README.md\n```md\n# demo project\n```";
    let changes = processor
        .apply_changes(unchanged)
        .expect("Failed to apply unchanged block");
    let change = changes
        .get("README.md")
        .expect("README.md should be in changes");
    assert!(matches!(change.status, FileStatus::Unmodified));

    let modified = "# README.md\n```md\n# renamed project\n```";
    let changes = processor
        .apply_changes(modified)
        .expect("Failed to apply modified block");
    let change = changes
        .get("README.md")
        .expect("README.md should be in changes");
    assert!(matches!(change.status, FileStatus::Modified));
}

#[test]
fn test_apply_duplicate_paths_last_wins() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let response = "\
# out.txt
```txt
first version
```

# out.txt
```txt
second version
```
";

    let changes = processor
        .apply_changes(response)
        .expect("Failed to apply duplicate blocks");

    assert_eq!(changes.len(), 1, "Duplicate paths should collapse");
    assert_eq!(
        fs::read_to_string(project_tree.root.join("out.txt")).expect("Failed to read out.txt"),
        "second version\n"
    );
    let change = changes.get("out.txt").expect("out.txt should be in changes");
    assert!(matches!(change.status, FileStatus::Created));
}

#[test]
fn test_preview_does_not_touch_disk() {
    let (project_tree, scratch_tree) = setup_project();
    let processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let response = "# would_be_new.txt\n```txt\ncontent\n```";
    let changes = processor
        .preview_changes(response)
        .expect("Failed to preview changes");

    let change = changes
        .get("would_be_new.txt")
        .expect("would_be_new.txt should be in changes");
    assert!(matches!(change.status, FileStatus::Created));
    assert!(
        !project_tree.root.join("would_be_new.txt").exists(),
        "Preview must not write to disk"
    );
}

#[test]
fn test_apply_skips_escaping_and_absolute_paths() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let response = "\
# ../escape.txt
```txt
outside
```

# /tmp/absolute.txt
```txt
outside
```

# inside.txt
```txt
inside
```
";

    let changes = processor
        .apply_changes(response)
        .expect("Failed to apply blocks");

    assert_eq!(changes.len(), 1, "Only the safe block should apply");
    assert!(changes.contains_key("inside.txt"));
    assert_eq!(
        fs::read_to_string(project_tree.root.join("inside.txt"))
            .expect("Failed to read inside.txt"),
        "inside\n"
    );
}

#[test]
fn test_pack_round_trips_through_parser() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let payload = processor
        .pack_files(&["main.py".to_string(), "src/lib.rs".to_string()])
        .expect("Failed to pack files");

    let blocks = ClipChangesProcessor::parse_blocks(&payload);
    assert_eq!(blocks.len(), 2, "Should recover both blocks");
    assert_eq!(blocks[0].path, "main.py");
    assert_eq!(blocks[0].content, "print('hello')\n");
    assert_eq!(blocks[1].path, "src/lib.rs");
    assert_eq!(blocks[1].content, "pub fn answer() -> u32 {\n    42\n}\n");
}

#[test]
fn test_pack_expands_directory_entries() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let payload = processor
        .pack_files(&["src".to_string()])
        .expect("Failed to pack directory");

    assert!(payload.starts_with("# src/lib.rs\n```rs\n"));
    assert_eq!(processor.selection(), ["src/lib.rs".to_string()]);
}

#[test]
fn test_smart_paste_resolves_references() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let result = processor
        .smart_paste("review main.py and create tests.py")
        .expect("Failed to smart paste");

    assert_eq!(result.references.len(), 2, "Should resolve both references");
    assert_eq!(result.references[0].path, "main.py");
    assert!(result.references[0].exists);
    assert_eq!(result.references[1].path, "tests.py");
    assert!(!result.references[1].exists);

    // Existing files carry their contents, missing ones become placeholders.
    assert!(result.payload.contains("# main.py\n```py\nprint('hello')\n```"));
    assert!(result.payload.contains("# tests.py\n```py\n```"));
}

#[test]
fn test_smart_paste_payload_applies_cleanly() {
    let (project_tree, scratch_tree) = setup_project();
    let mut processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let result = processor
        .smart_paste("ship main.py with tests.py please")
        .expect("Failed to smart paste");

    let target_tree = TreeBuilder::default()
        .create()
        .expect("Failed to create target tree");
    let mut target_processor =
        clip_changes::new_with_state_path(&target_tree.root, &scratch_tree.root.join("other.json"))
            .expect("Failed to create target processor");

    let changes = target_processor
        .apply_changes(&result.payload)
        .expect("Failed to apply payload");

    assert_eq!(changes.len(), 2);
    assert_eq!(
        fs::read_to_string(target_tree.root.join("main.py")).expect("Failed to read main.py"),
        "print('hello')\n"
    );
    assert_eq!(
        fs::read_to_string(target_tree.root.join("tests.py")).expect("Failed to read tests.py"),
        ""
    );
}

#[test]
fn test_resolver_dedupes_and_strips_punctuation() {
    let (project_tree, scratch_tree) = setup_project();
    let processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let references =
        processor.resolve_references("Look at `main.py`, then main.py again (see src/lib.rs).");

    let paths: Vec<&str> = references
        .iter()
        .map(|reference| reference.path.as_str())
        .collect();
    assert_eq!(paths, ["main.py", "src/lib.rs"]);
    assert!(references.iter().all(|reference| reference.exists));
}

#[test]
fn test_resolver_ignores_urls_and_prose() {
    let (project_tree, scratch_tree) = setup_project();
    let processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");

    let references = processor
        .resolve_references("see https://example.com/main.py for docs, e.g. the tutorial");

    assert!(
        references.is_empty(),
        "URLs and prose must not resolve, got {references:?}"
    );
}

#[test]
fn test_parser_skips_error_blocks_and_prose() {
    let response = "\
Some assistant prose.

# ERROR: Could not read broken.bin
```
permission denied
```

# kept.txt
```txt
kept
```

Closing remarks.
";

    let blocks = ClipChangesProcessor::parse_blocks(response);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].path, "kept.txt");
    assert_eq!(blocks[0].content, "kept\n");
}

#[test]
fn test_parser_handles_crlf_and_empty_blocks() {
    let response = "# a.txt\r\n```txt\r\nline one\r\n```\r\n\r\n# b.txt\r\n```txt\r\n```\r\n";

    let blocks = ClipChangesProcessor::parse_blocks(response);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].content, "line one\n");
    assert_eq!(blocks[1].path, "b.txt");
    assert_eq!(blocks[1].content, "");
}

#[test]
fn test_state_persists_between_processors() {
    let (project_tree, scratch_tree) = setup_project();
    let state_file = state_path(&scratch_tree);

    {
        let mut processor = clip_changes::new_with_state_path(&project_tree.root, &state_file)
            .expect("Failed to create processor");
        processor
            .pack_files(&["main.py".to_string()])
            .expect("Failed to pack files");
    }

    let processor = clip_changes::new_with_state_path(&project_tree.root, &state_file)
        .expect("Failed to reopen processor");
    assert_eq!(processor.selection(), ["main.py".to_string()]);
}

#[test]
fn test_state_for_other_project_is_discarded() {
    let (project_tree, scratch_tree) = setup_project();
    let state_file = state_path(&scratch_tree);

    {
        let mut processor = clip_changes::new_with_state_path(&project_tree.root, &state_file)
            .expect("Failed to create processor");
        processor
            .pack_files(&["main.py".to_string()])
            .expect("Failed to pack files");
    }

    let other_tree = TreeBuilder::default()
        .add_file("other.txt", "other\n")
        .create()
        .expect("Failed to create other tree");
    let processor = clip_changes::new_with_state_path(&other_tree.root, &state_file)
        .expect("Failed to create processor for other project");
    assert!(
        processor.selection().is_empty(),
        "Selection from another project must not leak"
    );
}

#[test]
fn test_scan_skips_ignored_hidden_and_binary_files() {
    let project_tree = TreeBuilder::default()
        .add_file("keep.rs", "fn main() {}\n")
        .add_file("Zebra.md", "# zebra\n")
        .add_file("node_modules/skip.js", "skipped\n")
        .add_file("target/skip.rs", "skipped\n")
        .add_file(".hidden", "skipped\n")
        .add_file("data.bin", "binary\u{0}payload")
        .create()
        .expect("Failed to create project tree");
    let scratch_tree = TreeBuilder::default()
        .create()
        .expect("Failed to create scratch tree");

    let processor =
        clip_changes::new_with_state_path(&project_tree.root, &state_path(&scratch_tree))
            .expect("Failed to create processor");
    let files = processor.scan_project().expect("Failed to scan project");

    assert_eq!(files, ["keep.rs".to_string(), "Zebra.md".to_string()]);
}
