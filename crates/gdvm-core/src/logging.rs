//! File logging for the managed root.
//!
//! Everything from the `gdvm` crates goes to `<root>/gdvm.log`; debug builds
//! mirror it to the terminal. Debug records are only kept when the user
//! opts in through `debug_logging`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};

use gdvm_platform::AppPaths;

const LOG_TARGET_PREFIX: &str = "gdvm";

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// The log file handle. A log removed while gdvm runs (an uninstall of the
/// whole root, a user clearing it by hand) is recreated on the next record.
struct LogFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    fn with_file<T>(&self, write: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            *file = open_append(&self.path)?;
        }

        write(&mut *file)
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(File::flush)
    }
}

/// Shrink a log larger than `max_size` to at most half of it, starting at
/// the first complete line.
fn truncate_to_recent(path: &Path, max_size: u64) -> io::Result<()> {
    let size = std::fs::metadata(path)?.len();
    if size <= max_size {
        return Ok(());
    }

    let contents = std::fs::read(path)?;
    let budget = usize::try_from(max_size / 2).unwrap_or(usize::MAX);
    let cut = contents.len().saturating_sub(budget);
    let start = contents[cut..]
        .iter()
        .position(|&byte| byte == b'\n')
        .map_or(contents.len(), |offset| cut + offset + 1);

    std::fs::write(path, &contents[start..])
}

fn config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Error)
        .add_filter_allow_str(LOG_TARGET_PREFIX)
        .build()
}

/// Install the global logger for `paths`. Returns `false` when a logger was
/// already installed by an earlier call; the level is applied either way.
pub fn init_logging(paths: &AppPaths, debug_enabled: bool, max_log_size: u64) -> bool {
    let log_path = paths.log_file();
    // No logger exists yet to report these.
    let _ = paths.ensure_dirs();
    let _ = truncate_to_recent(&log_path, max_log_size);

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if let Ok(file) = LogFile::open(log_path.clone()) {
        loggers.push(WriteLogger::new(LevelFilter::Debug, config(), file));
    }
    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        LevelFilter::Debug,
        config(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    let installed = !loggers.is_empty() && CombinedLogger::init(loggers).is_ok();
    set_log_level(debug_enabled);
    if installed {
        log::info!("gdvm {} logging to {}", env!("CARGO_PKG_VERSION"), log_path.display());
    }
    installed
}

fn level_for(debug_enabled: bool) -> LevelFilter {
    if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

pub fn set_log_level(debug_enabled: bool) {
    log::set_max_level(level_for(debug_enabled));
}
