//! The "active version" links under `<root>/bin`.
//!
//! Linux and other Unix hosts get one link, `bin/godot`, to the engine
//! binary. Windows gets `bin/godot.exe`. macOS gets a directory link
//! `bin/Godot.app` to the bundle plus `bin/godot` to the binary inside it.

use std::io;
use std::path::{Path, PathBuf};

use gdvm_backend::{DefaultLinkStatus, Os, SymlinkError};
use gdvm_platform::AppPaths;
use log::{debug, info, warn};

const BINARY_LINK: &str = "godot";
const WINDOWS_BINARY_LINK: &str = "godot.exe";
const BUNDLE_LINK: &str = "Godot.app";
const BUNDLE_BINARY: &str = "Contents/MacOS/Godot";

/// `ERROR_PRIVILEGE_NOT_HELD`: symlink creation without Developer Mode.
const WINDOWS_PRIVILEGE_NOT_HELD: i32 = 1314;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkInfo {
    pub link: PathBuf,
    pub target: PathBuf,
    /// macOS only: where `bin/Godot.app` points.
    pub bundle_target: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DefaultLinks {
    bin_dir: PathBuf,
    os: Os,
}

#[cfg(unix)]
fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(unix)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

#[cfg(windows)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(original, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_file(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

#[cfg(not(any(unix, windows)))]
fn symlink_dir(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

fn is_link(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_symlink())
}

fn remove_link(path: &Path) -> io::Result<()> {
    std::fs::remove_file(path).or_else(|_| std::fs::remove_dir(path))
}

fn validate(link: &Path) -> Result<(), SymlinkError> {
    if !is_link(link) {
        return Err(SymlinkError::invalid(link, "link was not created"));
    }
    std::fs::metadata(link)
        .map(|_| ())
        .map_err(|error| SymlinkError::invalid(link, format!("target unreachable: {error}")))
}

impl DefaultLinks {
    #[must_use]
    pub fn new(paths: &AppPaths, os: Os) -> Self {
        Self {
            bin_dir: paths.bin_dir(),
            os,
        }
    }

    /// The link a shell's `PATH` picks up.
    #[must_use]
    pub fn binary_link(&self) -> PathBuf {
        let name = if self.os == Os::Windows {
            WINDOWS_BINARY_LINK
        } else {
            BINARY_LINK
        };
        self.bin_dir.join(name)
    }

    #[must_use]
    pub fn bundle_link(&self) -> PathBuf {
        self.bin_dir.join(BUNDLE_LINK)
    }

    /// Point the default links at `target`, the executable (or, on macOS,
    /// the bundle) of an installed release. Existing links are replaced.
    ///
    /// # Errors
    /// Returns [`SymlinkError::Unsupported`] on unknown hosts,
    /// [`SymlinkError::Io`] when a link cannot be created and
    /// [`SymlinkError::InvalidSymlink`] when a created link does not
    /// resolve. Partially created links are left for the caller to clear.
    pub fn set_default(&self, target: &Path) -> Result<DefaultLinkStatus, SymlinkError> {
        if self.os == Os::Other {
            return Err(SymlinkError::Unsupported { os: self.os });
        }

        self.clear_default();
        std::fs::create_dir_all(&self.bin_dir)
            .map_err(|error| SymlinkError::io(&self.bin_dir, &error))?;

        match self.os {
            Os::MacOs => {
                let bundle_link = self.bundle_link();
                symlink_dir(target, &bundle_link)
                    .map_err(|error| SymlinkError::io(&bundle_link, &error))?;
                validate(&bundle_link)?;

                let binary_link = self.binary_link();
                symlink_file(&target.join(BUNDLE_BINARY), &binary_link)
                    .map_err(|error| SymlinkError::io(&binary_link, &error))?;
                validate(&binary_link)?;
            }
            Os::Windows => {
                let binary_link = self.binary_link();
                match symlink_file(target, &binary_link) {
                    Ok(()) => {}
                    Err(error) if error.raw_os_error() == Some(WINDOWS_PRIVILEGE_NOT_HELD) => {
                        warn!(
                            "Insufficient privilege to create {}; enable Developer Mode to link the default version",
                            binary_link.display()
                        );
                        return Ok(DefaultLinkStatus::InsufficientPrivilege);
                    }
                    Err(error) => return Err(SymlinkError::io(&binary_link, &error)),
                }
                validate(&binary_link)?;
            }
            Os::Linux | Os::Other => {
                let binary_link = self.binary_link();
                symlink_file(target, &binary_link)
                    .map_err(|error| SymlinkError::io(&binary_link, &error))?;
                validate(&binary_link)?;
            }
        }

        info!("Default version set to {}", target.display());
        Ok(DefaultLinkStatus::Linked)
    }

    /// Remove every default link that exists. Failures are logged.
    pub fn clear_default(&self) {
        for link in [self.binary_link(), self.bundle_link()] {
            if !is_link(&link) {
                continue;
            }
            match remove_link(&link) {
                Ok(()) => debug!("Removed link {}", link.display()),
                Err(error) => warn!("Failed to remove link {}: {error}", link.display()),
            }
        }
    }

    /// Whether any default link targets a path under `dir`, dangling or not.
    #[must_use]
    pub fn points_into(&self, dir: &Path) -> bool {
        [self.binary_link(), self.bundle_link()]
            .iter()
            .filter_map(|link| std::fs::read_link(link).ok())
            .any(|target| target.starts_with(dir))
    }

    /// # Errors
    /// Returns [`SymlinkError::NoVersionSet`] when no link exists and
    /// [`SymlinkError::InvalidSymlink`] when it exists but does not resolve.
    pub fn resolve_default(&self) -> Result<SymlinkInfo, SymlinkError> {
        let link = self.binary_link();
        if !is_link(&link) {
            return Err(SymlinkError::NoVersionSet);
        }

        let target =
            std::fs::read_link(&link).map_err(|error| SymlinkError::invalid(&link, error.to_string()))?;
        if let Err(error) = std::fs::metadata(&link) {
            return Err(SymlinkError::invalid(
                &link,
                format!("target {} unreachable: {error}", target.display()),
            ));
        }

        let bundle_target = if self.os == Os::MacOs {
            std::fs::read_link(self.bundle_link()).ok()
        } else {
            None
        };

        Ok(SymlinkInfo {
            link,
            target,
            bundle_target,
        })
    }
}
