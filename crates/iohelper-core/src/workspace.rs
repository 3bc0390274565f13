use std::path::{Path, PathBuf};

use iohelper_platform::{FileEntry, FileSystem, Result};

/// Filesystem backend bound to a root directory.
///
/// Relative names are resolved against `root`; absolute paths pass through.
/// Every method forwards to the backend after resolution, so callers hold
/// one explicit context instead of relying on the process working directory.
pub struct Workspace {
    root: PathBuf,
    fs: Box<dyn FileSystem>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, fs: Box<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: &str) -> String {
        let path = Path::new(name);
        if path.is_absolute() {
            name.to_string()
        } else {
            self.root.join(path).to_string_lossy().to_string()
        }
    }

    pub fn read_text(&self, name: &str) -> Result<String> {
        self.fs.read_text(&self.resolve(name))
    }

    pub fn write_text(&self, name: &str, content: &str) -> Result<usize> {
        self.fs.write_text(&self.resolve(name), content)
    }

    pub fn append_text(&self, name: &str, content: &str) -> Result<()> {
        self.fs.append_text(&self.resolve(name), content)
    }

    pub fn copy_file(&self, source: &str, destination: &str) -> Result<u64> {
        self.fs
            .copy_file(&self.resolve(source), &self.resolve(destination))
    }

    pub fn rename(&self, source: &str, destination: &str) -> Result<()> {
        self.fs.rename(&self.resolve(source), &self.resolve(destination))
    }

    pub fn remove_file(&self, name: &str) -> Result<()> {
        self.fs.remove_file(&self.resolve(name))
    }

    pub fn stat(&self, name: &str) -> Result<FileEntry> {
        self.fs.stat(&self.resolve(name))
    }

    pub fn touch(&self, name: &str) -> Result<()> {
        self.fs.touch(&self.resolve(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.fs.exists(&self.resolve(name))
    }

    pub fn list_dir(&self, name: &str) -> Result<Vec<FileEntry>> {
        self.fs.list_dir(&self.resolve(name))
    }

    pub fn create_dir(&self, name: &str) -> Result<()> {
        self.fs.create_dir(&self.resolve(name))
    }

    pub fn remove_dir(&self, name: &str) -> Result<()> {
        self.fs.remove_dir(&self.resolve(name))
    }
}
