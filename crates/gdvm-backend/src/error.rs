use std::path::PathBuf;

use gdvm_platform::{Arch, Os};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Request to {url} failed with HTTP {status}")]
    RequestFailed { url: String, status: u16 },

    #[error("Connection to {url} failed: {details}")]
    ConnectionFailed { url: String, details: String },
}

impl NetworkError {
    pub fn request_failed(url: impl Into<String>, status: u16) -> Self {
        Self::RequestFailed {
            url: url.into(),
            status,
        }
    }

    pub fn connection_failed(url: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            url: url.into(),
            details: details.into(),
        }
    }

    pub fn connection_failed_from<E>(url: impl Into<String>, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::connection_failed(url, error.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Godot {release} is not published for {os}/{arch}")]
    Unsupported { release: String, os: Os, arch: Arch },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymlinkError {
    #[error("No default version is set")]
    NoVersionSet,

    #[error("Invalid symlink at {}: {details}", .path.display())]
    InvalidSymlink { path: PathBuf, details: String },

    #[error("Default version links are not supported on {os}")]
    Unsupported { os: Os },

    #[error("IO error ({kind}) at {}: {message}", .path.display())]
    Io {
        path: PathBuf,
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl SymlinkError {
    pub fn invalid(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::InvalidSymlink {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionResolutionError {
    #[error("No release matches '{query}'")]
    NotFound { query: String },

    #[error("Invalid version query, unrecognized tokens: {}", .tokens.join(", "))]
    InvalidVersion { tokens: Vec<String> },

    #[error("Version resolution failed: {details}")]
    Failed { details: String },
}

impl VersionResolutionError {
    pub fn not_found(query: &[String]) -> Self {
        Self::NotFound {
            query: query.join(" "),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallationError {
    #[error("Checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: String,
        actual: String,
        filename: String,
    },

    #[error("Release not found: {release}")]
    NotFound { release: String },

    #[error("Installation failed during {phase}: {details}")]
    Failed {
        phase: &'static str,
        details: String,
    },

    #[error("Installation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Symlink(#[from] SymlinkError),

    #[error(transparent)]
    Resolution(#[from] VersionResolutionError),
}

impl InstallationError {
    pub fn failed(phase: &'static str, details: impl Into<String>) -> Self {
        Self::Failed {
            phase,
            details: details.into(),
        }
    }

    pub fn failed_from<E>(phase: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::failed(phase, error.to_string())
    }
}
