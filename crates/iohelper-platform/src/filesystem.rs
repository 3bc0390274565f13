use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata for a single path, queried at call time and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modified: Option<u64>,
    pub permissions: Option<String>,
    pub readonly: bool,
}

impl FileEntry {
    pub fn kind_label(&self) -> &'static str {
        if self.is_dir {
            "directory"
        } else {
            "file"
        }
    }
}

/// Whole-file text operations on a single path.
pub trait TextFile: Send + Sync {
    /// Entire file content. `NotFound` if the path is missing or a directory.
    fn read_text(&self, path: &str) -> Result<String>;
    /// Create or truncate, write `content` and a trailing newline.
    /// Returns the number of bytes written.
    fn write_text(&self, path: &str, content: &str) -> Result<usize>;
    /// Append `content` and a trailing newline, creating the file if absent.
    fn append_text(&self, path: &str, content: &str) -> Result<()>;
    /// Stream `source` into a newly created `destination`. Returns bytes copied.
    fn copy_file(&self, source: &str, destination: &str) -> Result<u64>;
    fn rename(&self, source: &str, destination: &str) -> Result<()>;
    fn remove_file(&self, path: &str) -> Result<()>;
    fn stat(&self, path: &str) -> Result<FileEntry>;
    /// Create an empty file if absent; existing content is left alone.
    fn touch(&self, path: &str) -> Result<()>;
    fn exists(&self, path: &str) -> bool;
}

/// Directory enumeration and creation.
pub trait Directory: Send + Sync {
    /// Immediate entries of `path`, in whatever order the backend yields them.
    fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>>;
    /// Create `path` and any missing parents. `AlreadyExists` if anything is
    /// already at `path`.
    fn create_dir(&self, path: &str) -> Result<()>;
    /// Delete a directory tree.
    fn remove_dir(&self, path: &str) -> Result<()>;
}

pub trait FileSystem: TextFile + Directory {}

impl<T: TextFile + Directory> FileSystem for T {}
