use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use iohelper_core::config::HelperConfig;
use iohelper_core::listing;
use iohelper_core::walkthrough;
use iohelper_core::workspace::Workspace;
use iohelper_platform::FileSystem;

#[derive(Parser, Debug)]
#[command(name = "iohelper")]
#[command(about = "Whole-file text and directory helper")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, env = "IOHELPER_CONFIG_PATH", global = true)]
    config_path: Option<String>,

    /// Directory that relative paths resolve against
    #[arg(long, env = "IOHELPER_WORK_DIR", global = true)]
    work_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "IOHELPER_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a file's content
    Read { path: String },
    /// Replace a file's content with TEXT and a trailing newline
    Write { path: String, text: String },
    /// Append TEXT and a newline, creating the file if needed
    Append { path: String, text: String },
    /// Copy SOURCE to DESTINATION, overwriting it
    Copy { source: String, destination: String },
    /// Rename SOURCE to DESTINATION
    Mv { source: String, destination: String },
    /// Remove a file
    Rm { path: String },
    /// Create an empty file if it does not exist
    Touch { path: String },
    /// Show file metadata
    Stat {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Create a directory and any missing parents
    Mkdir { path: String },
    /// Remove a directory tree
    Rmdir { path: String },
    /// Print each line of a file as a row
    Rows { path: String },
    /// Run the read/transform/rewrite sequence inside the work dir
    Walkthrough,
    /// Write the effective configuration to the config path
    InitConfig,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli
        .config_path
        .map(PathBuf::from)
        .unwrap_or_else(HelperConfig::default_path);
    let config_exists = config_path.exists();
    let mut config = HelperConfig::load_or_default(&config_path)?;

    // CLI args override config file
    if let Some(dir) = cli.work_dir {
        config.work_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if config_exists {
        info!("loaded config from {}", config_path.display());
    }

    let ws = Workspace::new(&config.work_dir, create_platform_filesystem()?);
    run_command(cli.command, &ws, &config, &config_path)
}

fn run_command(
    command: Commands,
    ws: &Workspace,
    config: &HelperConfig,
    config_path: &Path,
) -> Result<ExitCode> {
    match command {
        Commands::Read { path } => {
            let text = ws.read_text(&path).with_context(|| format!("failed to read {}", path))?;
            print!("{}", text);
        }
        Commands::Write { path, text } => {
            let written = ws
                .write_text(&path, &text)
                .with_context(|| format!("failed to write {}", path))?;
            info!("wrote {} bytes to {}", written, path);
        }
        Commands::Append { path, text } => {
            ws.append_text(&path, &text)
                .with_context(|| format!("failed to append to {}", path))?;
            info!("appended to {}", path);
        }
        Commands::Copy { source, destination } => {
            let copied = ws
                .copy_file(&source, &destination)
                .with_context(|| format!("failed to copy {} to {}", source, destination))?;
            info!("copied {} -> {} ({} bytes)", source, destination, copied);
        }
        Commands::Mv { source, destination } => {
            ws.rename(&source, &destination)
                .with_context(|| format!("failed to rename {} to {}", source, destination))?;
            info!("renamed {} -> {}", source, destination);
        }
        Commands::Rm { path } => {
            ws.remove_file(&path)
                .with_context(|| format!("failed to remove {}", path))?;
            info!("removed {}", path);
        }
        Commands::Touch { path } => {
            ws.touch(&path).with_context(|| format!("failed to touch {}", path))?;
        }
        Commands::Stat { path, json } => {
            let entry = ws.stat(&path).with_context(|| format!("failed to stat {}", path))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                print!("{}", listing::format_stat(&entry));
            }
        }
        Commands::Ls { path, json } => {
            let mut entries = ws
                .list_dir(&path)
                .with_context(|| format!("failed to list {}", path))?;
            listing::sort_entries(&mut entries, config.listing_order);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print!("{}", listing::format_table(&entries));
            }
        }
        Commands::Mkdir { path } => match ws.create_dir(&path) {
            Ok(()) => info!("dir created: {}", path),
            Err(e) if e.is_already_exists() => {
                warn!("{} already exists", path);
                return Ok(ExitCode::from(2));
            }
            Err(e) => return Err(e).with_context(|| format!("failed to create {}", path)),
        },
        Commands::Rmdir { path } => {
            ws.remove_dir(&path)
                .with_context(|| format!("failed to remove directory {}", path))?;
            info!("removed directory {}", path);
        }
        Commands::Rows { path } => {
            let text = ws.read_text(&path).with_context(|| format!("failed to read {}", path))?;
            for row in listing::rows(&text) {
                println!("row: {}", row);
            }
        }
        Commands::Walkthrough => {
            let report = walkthrough::run(ws, config.verify_copies)?;
            println!(
                "walkthrough complete: {} entries listed, {} bytes copied, {} now holds {} bytes",
                report.listed_entries.len(),
                report.copied_bytes,
                walkthrough::SOURCE_FILE,
                report.final_content.len(),
            );
        }
        Commands::InitConfig => {
            config.save(config_path)?;
            info!("config saved to {}", config_path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(unix)]
fn create_platform_filesystem() -> Result<Box<dyn FileSystem>> {
    Ok(Box::new(iohelper_unix::UnixFileSystem::new()))
}

#[cfg(target_os = "windows")]
fn create_platform_filesystem() -> Result<Box<dyn FileSystem>> {
    Ok(Box::new(iohelper_windows::WindowsFileSystem::new()))
}

#[cfg(not(any(unix, target_os = "windows")))]
fn create_platform_filesystem() -> Result<Box<dyn FileSystem>> {
    anyhow::bail!("filesystem not supported on this platform")
}
