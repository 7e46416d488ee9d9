// Logging Bootstrap
// Console output on stderr plus one log file per session

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_PREFIX: &str = "checklit_";
const KEEP_LOGS: usize = 30;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Where and whether to write session log files.
#[derive(Debug, Clone)]
struct LogSettings {
    dir: PathBuf,
    file_enabled: bool,
    cleanup: bool,
}

impl LogSettings {
    fn from_env() -> Self {
        let dir = std::env::var("CHECKLIT_LOG_DIR")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_logs_dir);
        Self {
            dir,
            file_enabled: !env_flag("CHECKLIT_DISABLE_FILE_LOG"),
            cleanup: !env_flag("CHECKLIT_DISABLE_LOG_CLEANUP"),
        }
    }
}

fn default_logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("checklit").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
/// A second call does nothing.
pub fn init_logging() {
    if FILE_GUARD.get().is_some() {
        return;
    }
    let settings = LogSettings::from_env();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout is reserved for command output
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let log_file = settings
        .file_enabled
        .then(|| open_session_log(&settings.dir))
        .flatten();

    match log_file {
        Some((writer, path)) => {
            let file = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .try_init();
            info!(path = %path.display(), version = env!("CARGO_PKG_VERSION"), "log.file");

            if settings.cleanup {
                let dir = settings.dir.clone();
                std::thread::spawn(move || prune_logs(&dir, KEEP_LOGS));
            }
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init();
            if settings.file_enabled {
                warn!(dir = %settings.dir.display(), "log.dir_not_writable_console_only");
            } else {
                info!("log.file_disabled");
            }
        }
    }
}

fn open_session_log(
    dir: &Path,
) -> Option<(tracing_appender::non_blocking::NonBlocking, PathBuf)> {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("cannot create log directory {}: {}", dir.display(), e);
        return None;
    }
    let name = format!("{}{}.log", LOG_PREFIX, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let appender = tracing_appender::rolling::never(dir, &name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    Some((writer, dir.join(name)))
}

/// Delete all but the `keep` most recently modified session logs in `dir`.
fn prune_logs(dir: &Path, keep: usize) {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return;
    };
    let mut logs: Vec<(SystemTime, PathBuf)> = read_dir
        .flatten()
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_PREFIX) && name.ends_with(".log")
        })
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect();

    if logs.len() <= keep {
        return;
    }
    // newest first
    logs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in logs.into_iter().skip(keep) {
        let _ = fs::remove_file(path);
    }
}
