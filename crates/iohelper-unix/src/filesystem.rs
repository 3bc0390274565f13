use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;
use std::time::UNIX_EPOCH;

use iohelper_platform::{Directory, FileEntry, FsError, Result, TextFile};
use tracing::{debug, warn};

pub struct UnixFileSystem;

impl UnixFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn to_file_entry(path: &Path) -> Result<FileEntry> {
        let display = path.to_string_lossy().to_string();
        // Dangling symlinks still get an entry describing the link itself
        let meta = fs::metadata(path)
            .or_else(|_| fs::symlink_metadata(path))
            .map_err(|e| FsError::from_io(display.clone(), e))?;

        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        let permissions = Some(format!("{:o}", meta.permissions().mode() & 0o7777));

        Ok(FileEntry {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| display.clone()),
            path: display,
            is_dir: meta.is_dir(),
            size: meta.len(),
            modified,
            permissions,
            readonly: meta.permissions().readonly(),
        })
    }
}

impl Default for UnixFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl TextFile for UnixFileSystem {
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
        let written = content.len() + 1;
        debug!("wrote {} ({} bytes)", path, written);
        Ok(written)
    }

    fn append_text(&self, path: &str, content: &str) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FsError::io(path, e))?;

        // The writer owns the handle; it is closed when dropped on any return.
        let mut writer = BufWriter::new(file);
        writer
            .write_all(content.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .map_err(|e| FsError::io(path, e))?;
        debug!("appended {} bytes to {}", content.len() + 1, path);
        Ok(())
    }

    fn copy_file(&self, source: &str, destination: &str) -> Result<u64> {
        let src = Path::new(source);
        if src.is_dir() {
            return Err(FsError::not_found(source));
        }
        let mut reader = fs::File::open(src).map_err(|e| FsError::from_io(source, e))?;

        if same_file(src, Path::new(destination)) {
            return Err(FsError::io(
                destination,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "source and destination are the same file",
                ),
            ));
        }

        let mut writer = fs::File::create(destination).map_err(|e| FsError::io(destination, e))?;
        let copied = io::copy(&mut reader, &mut writer)
            .and_then(|n| writer.flush().map(|_| n))
            .map_err(|e| FsError::io(destination, e))?;
        debug!("copied {} -> {} ({} bytes)", source, destination, copied);
        Ok(copied)
    }

    fn rename(&self, source: &str, destination: &str) -> Result<()> {
        fs::rename(source, destination).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound && fs::symlink_metadata(source).is_err() {
                FsError::not_found(source)
            } else {
                FsError::io(source, e)
            }
        })?;
        debug!("renamed {} -> {}", source, destination);
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        if Path::new(path).is_dir() {
            return Err(FsError::not_found(path));
        }
        fs::remove_file(path).map_err(|e| FsError::from_io(path, e))?;
        debug!("removed {}", path);
        Ok(())
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

impl Directory for UnixFileSystem {
    fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        let dir = Path::new(path);
        if dir.exists() && !dir.is_dir() {
            return Err(FsError::not_found(path));
        }
        let entries = fs::read_dir(dir).map_err(|e| FsError::from_io(path, e))?;

        let mut result = Vec::new();
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
                Err(e) => {
                    warn!("skipping {}: {}", entry.path().display(), e);
                }
            }
        }

        debug!("listed {} ({} entries)", path, result.len());
        Ok(result)
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(_) => return Err(FsError::already_exists(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(FsError::io(path, e)),
        }
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(path)
            .map_err(|e| FsError::io(path, e))?;
        debug!("created directory {}", path);
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> Result<()> {
        if !Path::new(path).is_dir() {
            return Err(FsError::not_found(path));
        }
        fs::remove_dir_all(path).map_err(|e| FsError::from_io(path, e))?;
        debug!("removed directory {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iohelper_platform::FsErrorKind;
    use tempfile::TempDir;

    fn setup() -> (TempDir, UnixFileSystem) {
        (TempDir::new().unwrap(), UnixFileSystem::new())
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
        assert_eq!(fs.read_text(&a).unwrap_err().kind(), FsErrorKind::NotFound);
    }

    #[test]
    fn test_write_truncates_existing_content() {
        let (dir, fs) = setup();
        let a = p(&dir, "a.txt");
        fs.write_text(&a, "a much longer first line").unwrap();
        fs.write_text(&a, "short").unwrap();
        assert_eq!(fs.read_text(&a).unwrap(), "short\n");
    }

    #[test]
    fn test_write_into_missing_dir_is_io() {
        let (dir, fs) = setup();
        let err = fs.write_text(&p(&dir, "nope/a.txt"), "x").unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::Io);
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
    fn test_append_to_directory_fails_as_io() {
        let (dir, fs) = setup();
        let err = fs.append_text(&dir.path().to_string_lossy(), "x").unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::Io);
    }

    #[test]
    fn test_read_directory_is_not_found() {
        let (dir, fs) = setup();
        let err = fs.read_text(&dir.path().to_string_lossy()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_copy_is_byte_identical() {
        let (dir, fs) = setup();
        let src = p(&dir, "src.txt");
        let dst = p(&dir, "dst.txt");
        fs.write_text(&src, "line one\nline two").unwrap();
        fs.write_text(&dst, "stale").unwrap();

        let copied = fs.copy_file(&src, &dst).unwrap();
        assert_eq!(copied, 18);
        assert_eq!(std::fs::read(&src).unwrap(), std::fs::read(&dst).unwrap());
    }

    #[test]
    fn test_copy_missing_source() {
        let (dir, fs) = setup();
        let err = fs.copy_file(&p(&dir, "absent"), &p(&dir, "dst")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!fs.exists(&p(&dir, "dst")));
    }

    #[test]
    fn test_copy_onto_itself_keeps_content() {
        let (dir, fs) = setup();
        let a = p(&dir, "a.txt");
        fs.write_text(&a, "keep me").unwrap();
        let err = fs.copy_file(&a, &a).unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::Io);
        assert_eq!(fs.read_text(&a).unwrap(), "keep me\n");
    }

    #[test]
    fn test_rename_moves_content() {
        let (dir, fs) = setup();
        let old = p(&dir, "old.txt");
        let new = p(&dir, "new.txt");
        fs.write_text(&old, "payload").unwrap();

        fs.rename(&old, &new).unwrap();
        assert!(fs.read_text(&old).unwrap_err().is_not_found());
        assert_eq!(fs.read_text(&new).unwrap(), "payload\n");
    }

    #[test]
    fn test_rename_missing_source() {
        let (dir, fs) = setup();
        let err = fs.rename(&p(&dir, "ghost"), &p(&dir, "b")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rename_into_missing_dir_is_io() {
        let (dir, fs) = setup();
        let src = p(&dir, "here.txt");
        fs.write_text(&src, "x").unwrap();
        let err = fs.rename(&src, &p(&dir, "nowhere/here.txt")).unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::Io);
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
    fn test_stat_reports_metadata() {
        let (dir, fs) = setup();
        let a = p(&dir, "a.txt");
        fs.write_text(&a, "hello").unwrap();

        let entry = fs.stat(&a).unwrap();
        assert_eq!(entry.name, "a.txt");
        assert_eq!(entry.size, 6);
        assert!(!entry.is_dir);
        assert!(entry.modified.is_some());
        assert!(entry.permissions.is_some());

        assert!(fs.stat(&dir.path().to_string_lossy()).unwrap().is_dir);
        assert!(fs.stat(&p(&dir, "absent")).unwrap_err().is_not_found());
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
        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert!(sub.is_dir);
    }

    #[test]
    fn test_list_missing_or_file_is_not_found() {
        let (dir, fs) = setup();
        assert!(fs.list_dir(&p(&dir, "absent")).unwrap_err().is_not_found());
        let a = p(&dir, "a.txt");
        fs.write_text(&a, "a").unwrap();
        assert!(fs.list_dir(&a).unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_dir_with_parents_then_already_exists() {
        let (dir, fs) = setup();
        let nested = p(&dir, "x/y/z");
        fs.create_dir(&nested).unwrap();
        assert!(std::path::Path::new(&nested).is_dir());

        let err = fs.create_dir(&nested).unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::AlreadyExists);
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
}
