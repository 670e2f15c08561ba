use std::path::{Path, PathBuf};
use thiserror::Error;

const ROOT_ENV_VAR: &str = "GDVM_ROOT";
const ROOT_DIR_NAME: &str = ".gdvm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
}

/// Layout of the managed root directory.
///
/// Every installed release lives in its own directory directly under the
/// root; the directory name is the only record of the installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
}

impl AppPaths {
    /// Resolve the managed root for the current user.
    ///
    /// The `GDVM_ROOT` environment variable takes precedence over the default
    /// `~/.gdvm` location.
    ///
    /// # Errors
    /// Returns an error when no override is set and the home directory cannot
    /// be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        if let Some(root) = std::env::var_os(ROOT_ENV_VAR).filter(|value| !value.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let home = dirs::home_dir().ok_or(AppPathsError::HomeDirUnavailable)?;
        Ok(Self::with_root(home.join(ROOT_DIR_NAME)))
    }

    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    #[must_use]
    pub fn install_dir(&self, release_dir_name: &str) -> PathBuf {
        self.root.join(release_dir_name)
    }

    #[must_use]
    pub fn release_cache_file(&self) -> PathBuf {
        self.root.join(".releases")
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.root.join("gdvm.log")
    }

    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Whether `name` is reserved by the layout and never a release directory.
    #[must_use]
    pub fn is_reserved_entry(name: &str) -> bool {
        name == "bin" || name.starts_with('.')
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Ensure the managed root and its `bin` directory exist on disk.
    ///
    /// # Errors
    /// Returns an error if either directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.bin_dir())?;
        Ok(())
    }
}
