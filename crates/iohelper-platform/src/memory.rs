use std::collections::BTreeMap;
use std::io;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{FsError, Result};
use crate::filesystem::{Directory, FileEntry, TextFile};

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, modified: u64 },
    Dir { modified: u64 },
}

/// In-memory backend with the same error classification as the host
/// implementations. Paths are normalized (`.`/`..` resolved, leading `/`
/// ignored) and the root always exists.
pub struct MemoryFileSystem {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node::Dir { modified: now_secs() });
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Seed a file verbatim (no trailing newline is added), creating parents.
    pub fn add_file(&self, path: &str, content: &str) {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        ensure_parents(&mut nodes, &key);
        nodes.insert(
            key,
            Node::File {
                data: content.as_bytes().to_vec(),
                modified: now_secs(),
            },
        );
    }

    pub fn add_dir(&self, path: &str) {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        ensure_parents(&mut nodes, &key);
        nodes.insert(key, Node::Dir { modified: now_secs() });
    }

    fn read_nodes(&self) -> RwLockReadGuard<'_, BTreeMap<String, Node>> {
        self.nodes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_nodes(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Node>> {
        self.nodes.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn parent_of(key: &str) -> Option<&str> {
    if key.is_empty() {
        return None;
    }
    Some(key.rfind('/').map(|i| &key[..i]).unwrap_or(""))
}

fn is_child_of(key: &str, dir: &str) -> bool {
    if dir.is_empty() {
        !key.is_empty()
    } else {
        key.len() > dir.len() && key.starts_with(dir) && key.as_bytes()[dir.len()] == b'/'
    }
}

fn ensure_parents(nodes: &mut BTreeMap<String, Node>, key: &str) {
    let mut current = parent_of(key);
    while let Some(dir) = current {
        nodes
            .entry(dir.to_string())
            .or_insert(Node::Dir { modified: now_secs() });
        current = parent_of(dir);
    }
}

fn io_err(kind: io::ErrorKind, msg: &str) -> io::Error {
    io::Error::new(kind, msg.to_string())
}

/// Parent of `key` must exist and be a directory before a file can be placed there.
fn check_parent(nodes: &BTreeMap<String, Node>, key: &str, path: &str) -> Result<()> {
    match parent_of(key).and_then(|p| nodes.get(p)) {
        Some(Node::Dir { .. }) => Ok(()),
        Some(Node::File { .. }) => Err(FsError::io(
            path,
            io_err(io::ErrorKind::Other, "parent is not a directory"),
        )),
        None => Err(FsError::io(
            path,
            io_err(io::ErrorKind::NotFound, "parent directory does not exist"),
        )),
    }
}

fn entry_for(key: &str, path: &str, node: &Node) -> FileEntry {
    let name = key
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or(path)
        .to_string();
    match node {
        Node::File { data, modified } => FileEntry {
            name,
            path: path.to_string(),
            is_dir: false,
            size: data.len() as u64,
            modified: Some(*modified),
            permissions: Some("644".to_string()),
            readonly: false,
        },
        Node::Dir { modified } => FileEntry {
            name,
            path: path.to_string(),
            is_dir: true,
            size: 0,
            modified: Some(*modified),
            permissions: Some("755".to_string()),
            readonly: false,
        },
    }
}

impl TextFile for MemoryFileSystem {
    fn read_text(&self, path: &str) -> Result<String> {
        let nodes = self.read_nodes();
        match nodes.get(&normalize(path)) {
            Some(Node::File { data, .. }) => String::from_utf8(data.clone())
                .map_err(|e| FsError::io(path, io::Error::new(io::ErrorKind::InvalidData, e))),
            _ => Err(FsError::not_found(path)),
        }
    }

    fn write_text(&self, path: &str, content: &str) -> Result<usize> {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        check_parent(&nodes, &key, path)?;
        if let Some(Node::Dir { .. }) = nodes.get(&key) {
            return Err(FsError::io(path, io_err(io::ErrorKind::Other, "is a directory")));
        }
        let mut data = content.as_bytes().to_vec();
        data.push(b'\n');
        let written = data.len();
        nodes.insert(
            key,
            Node::File {
                data,
                modified: now_secs(),
            },
        );
        Ok(written)
    }

    fn append_text(&self, path: &str, content: &str) -> Result<()> {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        check_parent(&nodes, &key, path)?;
        let node = nodes.entry(key).or_insert(Node::File {
            data: Vec::new(),
            modified: 0,
        });
        match node {
            Node::File { data, modified } => {
                data.extend_from_slice(content.as_bytes());
                data.push(b'\n');
                *modified = now_secs();
                Ok(())
            }
            Node::Dir { .. } => Err(FsError::io(path, io_err(io::ErrorKind::Other, "is a directory"))),
        }
    }

    fn copy_file(&self, source: &str, destination: &str) -> Result<u64> {
        let dst_key = normalize(destination);
        let mut nodes = self.write_nodes();
        let data = match nodes.get(&normalize(source)) {
            Some(Node::File { data, .. }) => data.clone(),
            _ => return Err(FsError::not_found(source)),
        };
        check_parent(&nodes, &dst_key, destination)?;
        if let Some(Node::Dir { .. }) = nodes.get(&dst_key) {
            return Err(FsError::io(
                destination,
                io_err(io::ErrorKind::Other, "is a directory"),
            ));
        }
        let copied = data.len() as u64;
        nodes.insert(
            dst_key,
            Node::File {
                data,
                modified: now_secs(),
            },
        );
        Ok(copied)
    }

    fn rename(&self, source: &str, destination: &str) -> Result<()> {
        let src_key = normalize(source);
        let dst_key = normalize(destination);
        let mut nodes = self.write_nodes();
        if src_key.is_empty() || !nodes.contains_key(&src_key) {
            return Err(FsError::not_found(source));
        }
        check_parent(&nodes, &dst_key, destination)?;
        if src_key == dst_key {
            return Ok(());
        }
        if is_child_of(&dst_key, &src_key) {
            return Err(FsError::io(
                destination,
                io_err(io::ErrorKind::InvalidInput, "cannot move a directory into itself"),
            ));
        }

        // Existing destination follows rename(2): like kinds are replaced,
        // a directory only when it is empty.
        let src_is_dir = matches!(nodes.get(&src_key), Some(Node::Dir { .. }));
        match nodes.get(&dst_key) {
            None => {}
            Some(Node::File { .. }) if !src_is_dir => {}
            Some(Node::Dir { .. }) if src_is_dir => {
                if nodes.keys().any(|k| is_child_of(k, &dst_key)) {
                    return Err(FsError::io(
                        destination,
                        io_err(io::ErrorKind::Other, "directory not empty"),
                    ));
                }
            }
            Some(Node::Dir { .. }) => {
                return Err(FsError::io(
                    destination,
                    io_err(io::ErrorKind::Other, "is a directory"),
                ))
            }
            Some(Node::File { .. }) => {
                return Err(FsError::io(
                    destination,
                    io_err(io::ErrorKind::Other, "not a directory"),
                ))
            }
        }
        nodes.remove(&dst_key);

        let moved: Vec<String> = nodes
            .keys()
            .filter(|k| **k == src_key || is_child_of(k, &src_key))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new_key = format!("{}{}", dst_key, &old[src_key.len()..]);
                nodes.insert(new_key, node);
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        match nodes.get(&key) {
            Some(Node::File { .. }) => {
                nodes.remove(&key);
                Ok(())
            }
            _ => Err(FsError::not_found(path)),
        }
    }

    fn stat(&self, path: &str) -> Result<FileEntry> {
        let key = normalize(path);
        let nodes = self.read_nodes();
        nodes
            .get(&key)
            .map(|node| entry_for(&key, path, node))
            .ok_or_else(|| FsError::not_found(path))
    }

    fn touch(&self, path: &str) -> Result<()> {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        match nodes.get(&key) {
            Some(Node::File { .. }) => Ok(()),
            Some(Node::Dir { .. }) => Err(FsError::io(path, io_err(io::ErrorKind::Other, "is a directory"))),
            None => {
                check_parent(&nodes, &key, path)?;
                nodes.insert(
                    key,
                    Node::File {
                        data: Vec::new(),
                        modified: now_secs(),
                    },
                );
                Ok(())
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.read_nodes().contains_key(&normalize(path))
    }
}

impl Directory for MemoryFileSystem {
    fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        let key = normalize(path);
        let nodes = self.read_nodes();
        match nodes.get(&key) {
            Some(Node::Dir { .. }) => {}
            _ => return Err(FsError::not_found(path)),
        }
        let base = path.trim_end_matches('/');
        Ok(nodes
            .iter()
            .filter(|(k, _)| is_child_of(k, &key) && parent_of(k) == Some(key.as_str()))
            .map(|(k, node)| {
                let name = k.rsplit('/').next().unwrap_or(k);
                let child_path = if base.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", base, name)
                };
                entry_for(k, &child_path, node)
            })
            .collect())
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        if nodes.contains_key(&key) {
            return Err(FsError::already_exists(path));
        }
        let mut ancestor = parent_of(&key);
        while let Some(dir) = ancestor {
            if let Some(Node::File { .. }) = nodes.get(dir) {
                return Err(FsError::io(
                    path,
                    io_err(io::ErrorKind::Other, "ancestor is not a directory"),
                ));
            }
            ancestor = parent_of(dir);
        }
        ensure_parents(&mut nodes, &key);
        nodes.insert(key, Node::Dir { modified: now_secs() });
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> Result<()> {
        let key = normalize(path);
        let mut nodes = self.write_nodes();
        match nodes.get(&key) {
            Some(Node::Dir { .. }) if !key.is_empty() => {}
            Some(Node::Dir { .. }) => {
                return Err(FsError::io(
                    path,
                    io_err(io::ErrorKind::InvalidInput, "refusing to remove the root"),
                ))
            }
            _ => return Err(FsError::not_found(path)),
        }
        nodes.retain(|k, _| *k != key && !is_child_of(k, &key));
        Ok(())
    }
}
