use anyhow::Context;
use clap::{Parser, Subcommand};
use patchlist_core::constants::LEDGER_DATE_FORMAT;
use patchlist_core::{
    hash_file, CoreConfig, FileStatus, Folder, LedgerRecovery, PatchService, UploadStore,
    DEFAULT_PATCHLIST_FILE, DEFAULT_STATUS_FILE, DEFAULT_UPLOAD_DIR,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "patchctl")]
#[command(about = "Patchlist manager CLI")]
struct Cli {
    /// Move a malformed ledger aside and start empty instead of refusing to run
    #[arg(long, global = true)]
    allow_ledger_reset: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .env if none exists and create the upload folders
    Setup {
        /// Environment file to create
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,
    },
    /// List every tracked file
    List,
    /// Upload files into a folder
    Upload {
        /// Files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Target folder: main, pack or custom
        #[arg(long, default_value = "main")]
        folder: Folder,
    },
    /// Turn a file ON or OFF in the patchlist
    Toggle {
        filename: String,
        /// ON or OFF
        status: FileStatus,
    },
    /// Delete a file and its record
    Delete { filename: String },
    /// Rewrite the patchlist from the ledger
    Regenerate,
    /// Compare the ledger with the upload tree
    Verify,
    /// Show counts and bytes per folder
    Summary,
    /// Print the SHA-256 of a file
    Hash { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patchlist_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let allow_reset = cli.allow_ledger_reset;

    match cli.command {
        Some(Commands::Setup { env_file }) => {
            if write_default_env(&env_file)? {
                println!("Created {} with default settings", env_file.display());
                dotenvy::from_path(&env_file).ok();
            } else {
                println!("Using existing {}", env_file.display());
            }
            let cfg = CoreConfig::from_env()?;
            let store = UploadStore::initialise(cfg.upload_dir())?;
            println!("Upload folders ready under {}", store.root_directory().display());
        }
        Some(Commands::List) => {
            let files = open_service(allow_reset)?.list_files();
            if files.is_empty() {
                println!("No files tracked.");
            }
            for entry in files {
                println!(
                    "{:<3} {:<6} {:>10}  {}  {}  {}",
                    entry.record.status,
                    entry.record.folder,
                    entry.record.size,
                    entry.record.uploaded_at.format(LEDGER_DATE_FORMAT),
                    entry.record.digest,
                    entry.filename
                );
            }
        }
        Some(Commands::Upload { paths, folder }) => {
            let service = open_service(allow_reset)?;
            let mut failed = 0;
            for path in paths {
                match upload_path(&service, &path, folder) {
                    Ok(line) => println!("{}", line),
                    Err(e) => {
                        failed += 1;
                        eprintln!("Error uploading {}: {:#}", path.display(), e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} file(s) failed to upload", failed);
            }
        }
        Some(Commands::Toggle { filename, status }) => {
            let entry = open_service(allow_reset)?.set_status(&filename, status)?;
            println!("{} is now {}", entry.filename, entry.record.status);
        }
        Some(Commands::Delete { filename }) => {
            let record = open_service(allow_reset)?.delete(&filename)?;
            println!("Deleted {} from {}", filename, record.folder);
        }
        Some(Commands::Regenerate) => {
            let service = open_service(allow_reset)?;
            let entries = service.regenerate_patchlist()?;
            println!(
                "Wrote {} entries to {}",
                entries,
                service.config().patchlist_file().display()
            );
        }
        Some(Commands::Verify) => {
            let report = open_service(allow_reset)?.verify()?;
            for file in &report.untracked {
                println!("untracked  {}/{} ({} bytes)", file.folder, file.filename, file.size);
            }
            for filename in &report.missing {
                println!("missing    {}", filename);
            }
            for stale in &report.stale {
                println!(
                    "stale      {}/{} recorded {} ({} bytes), found {} ({} bytes)",
                    stale.folder,
                    stale.filename,
                    stale.recorded_digest,
                    stale.recorded_size,
                    stale.actual_digest,
                    stale.actual_size
                );
            }
            if !report.is_clean() {
                anyhow::bail!("ledger and upload tree disagree");
            }
            println!("Ledger and upload tree agree.");
        }
        Some(Commands::Summary) => {
            let summary = open_service(allow_reset)?.summary();
            println!(
                "{} files ({} active, {} inactive), {} bytes",
                summary.total_files,
                summary.active_files,
                summary.inactive_files,
                summary.tracked_bytes
            );
            for (folder, s) in &summary.folders {
                println!(
                    "  {:<6} {} files, {} active, {} bytes",
                    folder, s.files, s.active, s.bytes
                );
            }
        }
        Some(Commands::Hash { path }) => {
            println!("{}  {}", hash_file(&path)?, path.display());
        }
        None => {
            println!("Use 'patchctl --help' for commands");
        }
    }

    Ok(())
}

fn open_service(allow_reset: bool) -> anyhow::Result<PatchService> {
    open_service_with(CoreConfig::from_env()?, allow_reset)
}

/// `--allow-ledger-reset` acknowledges a reset even when `ALLOW_LEDGER_RESET` is unset.
fn open_service_with(cfg: CoreConfig, allow_reset: bool) -> anyhow::Result<PatchService> {
    let cfg = if allow_reset {
        cfg.with_ledger_recovery(LedgerRecovery::MoveAside)
    } else {
        cfg
    };
    Ok(PatchService::open(Arc::new(cfg))?)
}

fn upload_path(service: &PatchService, path: &Path, folder: Folder) -> anyhow::Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let entry = service.upload(name, folder, file)?;
    Ok(format!(
        "{} -> {}  {}",
        path.display(),
        entry.record.patch_path(&entry.filename),
        entry.record.digest
    ))
}

fn default_env_contents() -> String {
    format!(
        "HOST=0.0.0.0\n\
         PORT=5000\n\
         UPLOAD_FOLDER={}\n\
         PATCHLIST_FILE={}\n\
         FILE_STATUS={}\n",
        DEFAULT_UPLOAD_DIR, DEFAULT_PATCHLIST_FILE, DEFAULT_STATUS_FILE
    )
}

/// Writes the default environment file. Returns `false` if one already exists.
fn write_default_env(path: &Path) -> anyhow::Result<bool> {
    let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("failed to create {}", path.display())),
    };
    file.write_all(default_env_contents().as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
