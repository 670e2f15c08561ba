use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Initializing,
    Downloading,
    VerifyingChecksum,
    Extracting,
    SettingDefault,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initializing => "initializing",
            Self::Downloading => "downloading",
            Self::VerifyingChecksum => "verifying checksum",
            Self::Extracting => "extracting",
            Self::SettingDefault => "setting default",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstallProgress {
    Initializing,
    Downloading {
        downloaded: u64,
        total: Option<u64>,
        bytes_per_second: u64,
    },
    VerifyingChecksum,
    Extracting,
    SettingDefault,
}

impl InstallProgress {
    #[must_use]
    pub fn stage(&self) -> InstallStage {
        match self {
            Self::Initializing => InstallStage::Initializing,
            Self::Downloading { .. } => InstallStage::Downloading,
            Self::VerifyingChecksum => InstallStage::VerifyingChecksum,
            Self::Extracting => InstallStage::Extracting,
            Self::SettingDefault => InstallStage::SettingDefault,
        }
    }
}

/// Receives progress from the install loop. Called synchronously and in
/// order; implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &InstallProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&InstallProgress) + Send + Sync,
{
    fn report(&self, progress: &InstallProgress) {
        self(progress);
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: &InstallProgress) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumStatus {
    Verified,
    /// Releases before 3.3 were published without checksums.
    SkippedByPolicy,
    /// The manifest or its entry could not be obtained; the archive was
    /// installed unverified.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultLinkStatus {
    Linked,
    /// Windows refused to create the link (Developer Mode disabled).
    InsufficientPrivilege,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyInstalled {
        release: String,
        path: PathBuf,
    },
    NewInstallation {
        release: String,
        path: PathBuf,
        checksum: ChecksumStatus,
        default_link: Option<DefaultLinkStatus>,
    },
}

impl InstallOutcome {
    #[must_use]
    pub fn release(&self) -> &str {
        match self {
            Self::AlreadyInstalled { release, .. } | Self::NewInstallation { release, .. } => {
                release
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::AlreadyInstalled { path, .. } | Self::NewInstallation { path, .. } => path,
        }
    }
}
