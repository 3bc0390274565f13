//! Fixed read / transform / rewrite sequence over a [`Workspace`], showing the
//! order in which the text-file and directory operations are typically used.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use iohelper_platform::FileEntry;

use crate::listing;
use crate::workspace::Workspace;

pub const SOURCE_FILE: &str = "test.txt";
pub const WRITTEN_FILE: &str = "test2.txt";
pub const COPY_FILE: &str = "copy.txt";
pub const RENAMED_FILE: &str = "renamed.txt";
pub const SCRATCH_DIR: &str = "tmp";

const SEED_TEXT: &str = "hello from iohelper";
const WRITTEN_TEXT: &str = "here's some content";
const APPENDED_TEXT: &str = "append this";

/// What each step of the walkthrough observed.
#[derive(Debug, Clone)]
pub struct WalkthroughReport {
    /// `true` when the source file was missing and had to be created
    pub seeded: bool,
    pub original_content: String,
    pub bytes_written: usize,
    pub listed_entries: Vec<String>,
    /// `false` when the scratch directory was already there
    pub scratch_created: bool,
    pub copied_bytes: u64,
    /// SHA-256 of the copied content, when verification was requested
    pub copy_digest: Option<String>,
    pub renamed: FileEntry,
    pub final_content: String,
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn verify_copy(ws: &Workspace, source: &str, destination: &str) -> Result<String> {
    let expected = sha256_hex(ws.read_text(source)?.as_bytes());
    let actual = sha256_hex(ws.read_text(destination)?.as_bytes());
    if expected != actual {
        anyhow::bail!(
            "checksum mismatch: expected {}, got {}",
            expected,
            actual
        );
    }
    Ok(actual)
}

pub fn run(ws: &Workspace, verify_copies: bool) -> Result<WalkthroughReport> {
    info!("walkthrough in {}", ws.root().display());

    let seeded = !ws.exists(SOURCE_FILE);
    if seeded {
        ws.write_text(SOURCE_FILE, SEED_TEXT)
            .with_context(|| format!("failed to seed {}", SOURCE_FILE))?;
        info!("seeded {}", SOURCE_FILE);
    }

    let original_content = ws
        .read_text(SOURCE_FILE)
        .with_context(|| format!("failed to read {}", SOURCE_FILE))?;
    info!("file content: {:?}", original_content);

    let bytes_written = ws
        .write_text(WRITTEN_FILE, WRITTEN_TEXT)
        .with_context(|| format!("failed to write {}", WRITTEN_FILE))?;
    info!("wrote {} ({} bytes)", WRITTEN_FILE, bytes_written);

    ws.append_text(SOURCE_FILE, APPENDED_TEXT)
        .with_context(|| format!("failed to append to {}", SOURCE_FILE))?;

    let mut entries = ws.list_dir(".").context("failed to list workspace")?;
    listing::sort_entries(&mut entries, listing::ListingOrder::DirsFirst);
    for entry in &entries {
        info!("{}", listing::format_entry(entry));
    }
    let listed_entries = entries.into_iter().map(|e| e.name).collect();

    let scratch_created = match ws.create_dir(SCRATCH_DIR) {
        Ok(()) => {
            info!("dir created: {}", SCRATCH_DIR);
            true
        }
        Err(e) if e.is_already_exists() => {
            warn!("{} already exists, reusing it", SCRATCH_DIR);
            false
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to create {}", SCRATCH_DIR));
        }
    };

    let copied_bytes = ws
        .copy_file(SOURCE_FILE, COPY_FILE)
        .with_context(|| format!("failed to copy {} to {}", SOURCE_FILE, COPY_FILE))?;
    let copy_digest = if verify_copies {
        let digest = verify_copy(ws, SOURCE_FILE, COPY_FILE)?;
        info!("file copied ({} bytes, sha256 {})", copied_bytes, digest);
        Some(digest)
    } else {
        info!("file copied ({} bytes)", copied_bytes);
        None
    };

    ws.rename(SOURCE_FILE, RENAMED_FILE)
        .with_context(|| format!("failed to rename {} to {}", SOURCE_FILE, RENAMED_FILE))?;

    let renamed = ws
        .stat(RENAMED_FILE)
        .with_context(|| format!("failed to stat {}", RENAMED_FILE))?;
    for line in listing::format_stat(&renamed).lines() {
        info!("{}", line);
    }

    ws.rename(COPY_FILE, SOURCE_FILE)
        .with_context(|| format!("failed to rename {} to {}", COPY_FILE, SOURCE_FILE))?;
    info!("file renamed");

    ws.remove_file(RENAMED_FILE)
        .with_context(|| format!("failed to remove {}", RENAMED_FILE))?;
    info!("file removed");

    let final_content = ws
        .read_text(SOURCE_FILE)
        .with_context(|| format!("failed to read {}", SOURCE_FILE))?;

    Ok(WalkthroughReport {
        seeded,
        original_content,
        bytes_written,
        listed_entries,
        scratch_created,
        copied_bytes,
        copy_digest,
        renamed,
        final_content,
    })
}
