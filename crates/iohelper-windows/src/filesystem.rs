use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

use iohelper_platform::{Directory, FileEntry, FsError, Result, TextFile};
use tracing::{debug, warn};

pub struct WindowsFileSystem;

impl WindowsFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn permissions_of(meta: &fs::Metadata) -> String {
        let mut perms = String::new();

        if meta.is_dir() {
            perms.push('d');
        } else {
            perms.push('-');
        }

        if meta.permissions().readonly() {
            perms.push_str("r-");
        } else {
            perms.push_str("rw");
        }

        perms
    }

    fn to_file_entry(path: &Path) -> Result<FileEntry> {
        let display = path.to_string_lossy().to_string();
        let meta = fs::metadata(path).map_err(|e| FsError::from_io(display.clone(), e))?;

        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        Ok(FileEntry {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| display.clone()),
            path: display,
            is_dir: meta.is_dir(),
            size: if meta.is_dir() { 0 } else { meta.len() },
            modified,
            permissions: Some(Self::permissions_of(&meta)),
            readonly: meta.permissions().readonly(),
        })
    }
}

impl Default for WindowsFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFile for WindowsFileSystem {
    fn read_text(&self, path: &str) -> Result<String> {
        if Path::new(path).is_dir() {
            return Err(FsError::not_found(path));
        }
        let text = fs::read_to_string(path).map_err(|e| FsError::from_io(path, e))?;
        debug!("read {} ({} bytes)", path, text.len());
        Ok(text)
    }

    fn write_text(&self, path: &str, content: &str) -> Result<usize> {
        let mut file = fs::File::create(path).map_err(|e| FsError::io(path, e))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.flush())
            .map_err(|e| FsError::io(path, e))?;
        Ok(content.len() + 1)
    }

    fn append_text(&self, path: &str, content: &str) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FsError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(content.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .map_err(|e| FsError::io(path, e))
    }

    fn copy_file(&self, source: &str, destination: &str) -> Result<u64> {
        let src = Path::new(source);
        if src.is_dir() {
            return Err(FsError::not_found(source));
        }
        let mut reader = fs::File::open(src).map_err(|e| FsError::from_io(source, e))?;

        let same = match (fs::canonicalize(src), fs::canonicalize(destination)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if same {
            return Err(FsError::io(
                destination,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "source and destination are the same file",
                ),
            ));
        }

        let mut writer = fs::File::create(destination).map_err(|e| FsError::io(destination, e))?;
        io::copy(&mut reader, &mut writer)
            .and_then(|n| writer.flush().map(|_| n))
            .map_err(|e| FsError::io(destination, e))
    }

    fn rename(&self, source: &str, destination: &str) -> Result<()> {
        // MoveFileEx replaces an existing destination file, matching Unix rename(2)
        fs::rename(source, destination).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound && fs::symlink_metadata(source).is_err() {
                FsError::not_found(source)
            } else {
                FsError::io(source, e)
            }
        })
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        if Path::new(path).is_dir() {
            return Err(FsError::not_found(path));
        }
        fs::remove_file(path).map_err(|e| FsError::from_io(path, e))
    }

    fn stat(&self, path: &str) -> Result<FileEntry> {
        Self::to_file_entry(Path::new(path))
    }

    fn touch(&self, path: &str) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(drop)
            .map_err(|e| FsError::io(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}

impl Directory for WindowsFileSystem {
    fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        let dir_path = Path::new(path);
        if dir_path.exists() && !dir_path.is_dir() {
            return Err(FsError::not_found(path));
        }
        let entries = fs::read_dir(dir_path).map_err(|e| FsError::from_io(path, e))?;

        let mut result: Vec<FileEntry> = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping dir entry: {}", e);
                    continue;
                }
            };

            match Self::to_file_entry(&entry.path()) {
                Ok(fe) => result.push(fe),
                Err(e) => warn!("skipping {}: {}", entry.path().display(), e),
            }
        }

        Ok(result)
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(_) => return Err(FsError::already_exists(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(FsError::io(path, e)),
        }
        fs::create_dir_all(path).map_err(|e| FsError::io(path, e))?;
        debug!("created directory {}", path);
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> Result<()> {
        if !Path::new(path).is_dir() {
            return Err(FsError::not_found(path));
        }
        fs::remove_dir_all(path).map_err(|e| FsError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iohelper_platform::FsErrorKind;
    use tempfile::TempDir;

    fn setup() -> (TempDir, WindowsFileSystem) {
        (TempDir::new().unwrap(), WindowsFileSystem::new())
    }

    fn p(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().to_string()
    }

    #[test]
    fn test_write_read_remove_scenario() {
        let (dir, fs) = setup();
        let a = p(&dir, "a.txt");

        assert_eq!(fs.write_text(&a, "hello").unwrap(), 6);
        assert_eq!(fs.read_text(&a).unwrap(), "hello\n");
        fs.remove_file(&a).unwrap();
        assert!(fs.read_text(&a).unwrap_err().is_not_found());
    }

    #[test]
    fn test_append_twice_to_fresh_file() {
        let (dir, fs) = setup();
        let log = p(&dir, "log.txt");
        fs.append_text(&log, "first").unwrap();
        fs.append_text(&log, "second").unwrap();
        assert_eq!(fs.read_text(&log).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_read_directory_is_not_found() {
        let (dir, fs) = setup();
        assert!(fs.read_text(&dir.path().to_string_lossy()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_copy_is_byte_identical() {
        let (dir, fs) = setup();
        let src = p(&dir, "src.txt");
        let dst = p(&dir, "dst.txt");
        fs.write_text(&src, "line one\nline two").unwrap();
        fs.write_text(&dst, "stale").unwrap();

        assert_eq!(fs.copy_file(&src, &dst).unwrap(), 18);
        assert_eq!(std::fs::read(&src).unwrap(), std::fs::read(&dst).unwrap());
    }

    #[test]
    fn test_copy_missing_source_and_onto_itself() {
        let (dir, fs) = setup();
        assert!(fs
            .copy_file(&p(&dir, "absent"), &p(&dir, "dst"))
            .unwrap_err()
            .is_not_found());

        let a = p(&dir, "a.txt");
        fs.write_text(&a, "keep me").unwrap();
        assert_eq!(fs.copy_file(&a, &a).unwrap_err().kind(), FsErrorKind::Io);
        assert_eq!(fs.read_text(&a).unwrap(), "keep me\n");
    }

    #[test]
    fn test_remove_missing_and_directory() {
        let (dir, fs) = setup();
        assert!(fs.remove_file(&p(&dir, "absent")).unwrap_err().is_not_found());
        let sub = p(&dir, "sub");
        fs.create_dir(&sub).unwrap();
        assert!(fs.remove_file(&sub).unwrap_err().is_not_found());
        assert!(fs.exists(&sub));
    }

    #[test]
    fn test_touch_keeps_existing_content() {
        let (dir, fs) = setup();
        let a = p(&dir, "a.txt");
        fs.touch(&a).unwrap();
        assert_eq!(fs.stat(&a).unwrap().size, 0);
        fs.write_text(&a, "data").unwrap();
        fs.touch(&a).unwrap();
        assert_eq!(fs.read_text(&a).unwrap(), "data\n");
    }

    #[test]
    fn test_list_dir_entries() {
        let (dir, fs) = setup();
        fs.write_text(&p(&dir, "a.txt"), "a").unwrap();
        fs.create_dir(&p(&dir, "sub")).unwrap();

        let entries = fs.list_dir(&dir.path().to_string_lossy()).unwrap();
        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "sub"]);

        assert!(fs.list_dir(&p(&dir, "absent")).unwrap_err().is_not_found());
        assert!(fs.list_dir(&p(&dir, "a.txt")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_dir_tree() {
        let (dir, fs) = setup();
        let sub = p(&dir, "sub");
        fs.create_dir(&sub).unwrap();
        fs.write_text(&p(&dir, "sub/inner.txt"), "x").unwrap();

        fs.remove_dir(&sub).unwrap();
        assert!(!fs.exists(&sub));
        assert!(fs.remove_dir(&sub).unwrap_err().is_not_found());
    }

    #[test]
    fn test_permissions_string() {
        let dir = TempDir::new().unwrap();
        let fs = WindowsFileSystem::new();
        let file = dir.path().join("a.txt").to_string_lossy().to_string();
        fs.write_text(&file, "x").unwrap();

        assert_eq!(fs.stat(&file).unwrap().permissions.as_deref(), Some("-rw"));
        let root = fs.stat(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(root.permissions.as_deref(), Some("drw"));
        assert_eq!(root.size, 0);
    }

    #[test]
    fn test_create_then_already_exists() {
        let dir = TempDir::new().unwrap();
        let fs = WindowsFileSystem::new();
        let sub = dir.path().join("a").join("b").to_string_lossy().to_string();
        fs.create_dir(&sub).unwrap();
        assert!(fs.create_dir(&sub).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_rename_then_old_path_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = WindowsFileSystem::new();
        let old = dir.path().join("old.txt").to_string_lossy().to_string();
        let new = dir.path().join("new.txt").to_string_lossy().to_string();
        fs.write_text(&old, "v").unwrap();
        fs.rename(&old, &new).unwrap();
        assert!(fs.read_text(&old).unwrap_err().is_not_found());
        assert_eq!(fs.read_text(&new).unwrap(), "v\n");
    }
}
