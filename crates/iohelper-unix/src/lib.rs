// Unix filesystem backend

#[cfg(unix)]
pub mod filesystem;

#[cfg(unix)]
pub use filesystem::UnixFileSystem;
