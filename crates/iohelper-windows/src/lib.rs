// Windows filesystem backend

#[cfg(target_os = "windows")]
pub mod filesystem;

#[cfg(target_os = "windows")]
pub use filesystem::WindowsFileSystem;
