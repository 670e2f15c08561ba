use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

use fs2::FileExt;
use gdvm_platform::AppPaths;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another gdvm process is modifying {0}")]
    AlreadyLocked(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// Advisory lock over the managed root, held for the lifetime of the guard.
#[derive(Debug)]
pub struct RootLock {
    _file: File,
}

impl RootLock {
    /// # Errors
    /// Returns [`LockError::AlreadyLocked`] when another process holds the
    /// lock.
    pub fn acquire(paths: &AppPaths) -> Result<Self, LockError> {
        paths
            .ensure_dirs()
            .map_err(|error| LockError::io("failed to create managed root", error))?;

        let mut lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(paths.lock_file())
            .map_err(|error| LockError::io("failed to open lock file", error))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(LockError::AlreadyLocked(paths.root.display().to_string()));
            }
            Err(error) => return Err(LockError::io("failed to acquire lock", error)),
        }

        lock_file
            .set_len(0)
            .and_then(|()| lock_file.seek(SeekFrom::Start(0)).map(|_| ()))
            .and_then(|()| writeln!(lock_file, "{}", std::process::id()))
            .map_err(|error| LockError::io("failed to write lock metadata", error))?;

        Ok(Self { _file: lock_file })
    }
}
