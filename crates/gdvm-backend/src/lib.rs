//! Release model and shared contracts for gdvm.
//!
//! - [`Release`] parsing, naming and ordering.
//! - Typed error families for every expected failure.
//! - Install progress and outcome types.
//! - The async [`ReleaseCatalog`] / [`AssetSource`] seams remote sources
//!   implement.

mod error;
mod progress;
mod traits;
mod types;

pub use error::{
    InstallationError, NetworkError, PlatformError, SymlinkError, VersionResolutionError,
};
pub use progress::{
    ChecksumStatus, DefaultLinkStatus, InstallOutcome, InstallProgress, InstallStage, NoProgress,
    ProgressSink,
};
pub use traits::{ArchiveStream, AssetSource, ReleaseCatalog};
pub use types::{Release, ReleaseType, ReleaseTypeParseError, Runtime, stability_prefix};

pub use gdvm_platform::{Arch, HostPlatform, Os};
