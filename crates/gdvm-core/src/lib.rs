//! Release resolution, download and installation engine for gdvm.
//!
//! [`VersionManager`] is the facade a front end drives. The pieces it wires
//! together are public for callers that need finer control:
//! - [`platform_names`] maps a release and host to the vendor asset name.
//! - [`query`] resolves user queries and project requirements.
//! - [`Coordinator`] lists the catalog and fetches assets with mirror
//!   fallback.
//! - [`Installer`] runs download, verification, extraction and linking.
//! - [`DefaultLinks`] manages the active-version links.

mod archive;
mod checksum;
mod coordinator;
mod download;
mod install;
mod installed;
mod links;
mod lock;
pub mod logging;
mod manager;
pub mod platform_names;
pub mod query;
mod release_cache;
mod settings;
mod sources;

pub use archive::{ArchiveError, extract_zip};
pub use checksum::{MANIFEST_FILE, parse_expected_checksum, sha512_hex};
pub use coordinator::{Coordinator, DEFAULT_CACHE_TTL_HOURS};
pub use download::{PROGRESS_STEP, download_to_memory};
pub use install::{InstallOptions, Installer, executable_path};
pub use installed::list_installed;
pub use links::{DefaultLinks, SymlinkInfo};
pub use lock::{LockError, RootLock};
pub use manager::{ManagerError, VersionManager};
pub use query::SortOrder;
pub use release_cache::{CachedCatalog, ReleaseCache};
pub use settings::{Settings, SettingsError, is_valid_github_token};
pub use sources::{
    DEFAULT_CATALOG_API_URL, DEFAULT_MIRROR_BASE_URL, DEFAULT_PRIMARY_BASE_URL, GithubSource,
    MirrorSource, build_http_client,
};

pub use gdvm_backend::{
    Arch, ArchiveStream, AssetSource, ChecksumStatus, DefaultLinkStatus, HostPlatform,
    InstallOutcome, InstallProgress, InstallStage, InstallationError, NetworkError, NoProgress, Os,
    PlatformError, ProgressSink, Release, ReleaseCatalog, ReleaseType, Runtime, SymlinkError,
    VersionResolutionError,
};
pub use gdvm_platform::{AppPaths, AppPathsError};
