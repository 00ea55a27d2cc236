use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

const MEMORY_URL: &str = "sqlite::memory:";

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence, then `--log-level`, then `info`.
pub fn init_tracing(log_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://` URL that
/// creates the file on first use.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == MEMORY_URL || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_string();
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    match query {
        Some(query) if query.contains("mode=") => {
            format!("sqlite://{}?{query}", absolute.display())
        }
        Some(query) => format!("sqlite://{}?{query}&mode=rwc", absolute.display()),
        None => format!("sqlite://{}?mode=rwc", absolute.display()),
    }
}

/// Create the parent directory of a file-backed database.
pub fn prepare_sqlite_dir(db_url: &str) -> Result<()> {
    if db_url == MEMORY_URL || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let Some(rest) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    Ok(())
}
