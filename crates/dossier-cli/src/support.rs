use chrono::{Local, NaiveDate};
use dossier_kernel::{DossierError, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "DOSSIER_LOG";

/// Diagnostics go to stderr so stdout stays a clean JSON payload.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .try_init();
}

pub fn exit_with_error(err: &DossierError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}

pub fn parse_as_of(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        None => Ok(Local::now().date_naive()),
        Some(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
            DossierError::InvalidDate {
                value: value.to_string(),
            }
        }),
    }
}

pub fn parse_as_of_or_exit(raw: Option<&str>) -> NaiveDate {
    parse_as_of(raw).unwrap_or_else(|e| exit_with_error(&e))
}

pub fn require_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(DossierError::DirectoryNotFound {
            path: dir.to_path_buf(),
        })
    }
}

/// Absolute form of `path` with `.` and `..` folded, without touching the
/// filesystem.
fn lexical_absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Refuse an output file placed directly under the filesystem root.
pub fn check_output_path(path: &Path) -> Result<PathBuf> {
    let resolved = lexical_absolute(path);
    let at_root = match resolved.parent() {
        None => true,
        Some(parent) => parent.parent().is_none(),
    };
    if at_root {
        return Err(DossierError::OutputAtRoot {
            path: path.to_path_buf(),
        });
    }
    Ok(resolved)
}

/// Write `payload` to `path`, creating parent directories.
pub fn write_output(path: &Path, payload: &str) -> Result<()> {
    let resolved = check_output_path(path)?;
    if let Some(parent) = resolved.parent() {
        fs::create_dir_all(parent).map_err(|source| DossierError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&resolved, payload).map_err(|source| DossierError::Io {
        path: resolved.clone(),
        source,
    })
}

pub fn write_stdout(payload: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(payload.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|source| DossierError::Io {
            path: PathBuf::from("<stdout>"),
            source,
        })
}
