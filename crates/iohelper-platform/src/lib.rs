// Platform-neutral filesystem contracts

pub mod error;
pub mod filesystem;
pub mod memory;

pub use error::{FsError, FsErrorKind, Result};
pub use filesystem::{Directory, FileEntry, FileSystem, TextFile};
pub use memory::MemoryFileSystem;
