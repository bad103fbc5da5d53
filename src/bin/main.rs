use clap::{ArgGroup, Parser};
use clip_changes::{self, publish_payload, Clipboard, FileStatus, SystemClipboard};
use std::path::PathBuf;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{fmt, EnvFilter};

fn parse_selection(s: &str) -> std::result::Result<String, String> {
    if s.trim().is_empty() {
        Err("Selection entry cannot be empty".to_string())
    } else {
        Ok(s.trim().to_string())
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["copy", "smart_paste", "apply", "list"]),
))]
struct Cli {
    /// Project root directory
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Copy the selected files to the clipboard as formatted blocks
    #[arg(short, long, group = "mode")]
    copy: bool,

    /// Smart Paster: resolve file references from clipboard text and publish
    /// the formatted contents back to the clipboard
    #[arg(short = 'm', long = "smart-paste", group = "mode")]
    smart_paste: bool,

    /// Apply file blocks from clipboard text to disk
    #[arg(short, long, group = "mode")]
    apply: bool,

    /// List the selectable project files
    #[arg(long, group = "mode")]
    list: bool,

    /// Comma-separated files or directories to copy (defaults to the stored
    /// selection)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_selection)]
    files: Option<Vec<String>>,

    /// Read input text from a file instead of the clipboard
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// With --apply, classify the blocks without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Log level
    #[arg(global = true, short, long, value_enum, default_value = "error")]
    log: LevelFilter,
}

fn read_input(input: Option<&PathBuf>, clipboard: &impl Clipboard) -> clip_changes::Result<String> {
    match input {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => clipboard.get_text(),
    }
}

fn format_size(bytes: usize) -> String {
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{:.1} MB", kb / 1024.0)
    }
}

fn print_changes_summary(changes: &std::collections::HashMap<String, clip_changes::FileChange>) {
    let mut created = Vec::new();
    let mut modified = Vec::new();
    let mut unmodified = Vec::new();

    for (path, change) in changes {
        match change.status {
            FileStatus::Created => created.push(path),
            FileStatus::Modified => modified.push(path),
            FileStatus::Unmodified => unmodified.push(path),
        }
    }

    created.sort();
    modified.sort();
    unmodified.sort();

    println!("\n📊 Apply Summary:");
    println!("=================");
    println!("Total files: {}", changes.len());
    println!("  Created:    {}", created.len());
    println!("  Modified:   {}", modified.len());
    println!("  Unmodified: {}", unmodified.len());

    if !created.is_empty() {
        println!("\n✨ Created Files:");
        for path in created {
            println!("  + {path}");
        }
    }

    if !modified.is_empty() {
        println!("\n🔄 Modified Files:");
        for path in modified {
            println!("  ~ {path}");
        }
    }

    if !unmodified.is_empty() {
        println!("\n✅ Unmodified Files:");
        for path in unmodified {
            println!("  = {path}");
        }
    }
}

#[tokio::main]
async fn main() -> clip_changes::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive(cli.log.into());

    fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .pretty()
        .init();

    let mut processor = clip_changes::new(&cli.root)?;
    let clipboard = SystemClipboard::new();

    if cli.list {
        for path in processor.scan_project()? {
            println!("{path}");
        }
        return Ok(());
    }

    if cli.copy {
        let payload = if let Some(files) = cli.files {
            debug!(file_count = files.len(), "Packing files from command line");
            processor.pack_files(&files)?
        } else {
            debug!("Packing stored selection");
            processor.pack_selection()?
        };

        if payload.is_empty() {
            println!("No files selected to copy.");
            return Ok(());
        }

        if publish_payload(&clipboard, &payload) {
            println!(
                "✅ Copied {} file(s) to clipboard! ({})",
                processor.selection().len(),
                format_size(payload.len())
            );
        }
        return Ok(());
    }

    if cli.smart_paste {
        let text = read_input(cli.input.as_ref(), &clipboard)?;
        let result = processor.smart_paste(&text)?;

        if result.references.is_empty() {
            println!("No file references found in input.");
            return Ok(());
        }

        for reference in &result.references {
            if reference.exists {
                println!("  📄 {}", reference.path);
            } else {
                println!("  🆕 {} (to be created)", reference.path);
            }
        }

        if publish_payload(&clipboard, &result.payload) {
            println!(
                "✅ Formatted {} reference(s) to clipboard! ({})",
                result.references.len(),
                format_size(result.payload.len())
            );
        }
        return Ok(());
    }

    if cli.apply {
        let text = read_input(cli.input.as_ref(), &clipboard)?;
        let changes = if cli.dry_run {
            debug!("Classifying blocks without writing");
            processor.preview_changes(&text)?
        } else {
            debug!("Applying blocks to disk");
            processor.apply_changes(&text)?
        };

        print_changes_summary(&changes);
        return Ok(());
    }

    unreachable!("ArgGroup ensures exactly one mode is provided")
}
