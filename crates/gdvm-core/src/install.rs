//! The installation pipeline: download, verify, extract, link.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gdvm_backend::{
    ChecksumStatus, DefaultLinkStatus, HostPlatform, InstallOutcome, InstallProgress,
    InstallationError, ProgressSink, Release, SymlinkError, VersionResolutionError,
};
use gdvm_platform::AppPaths;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::archive::extract_zip;
use crate::checksum::{parse_expected_checksum, sha512_hex};
use crate::coordinator::Coordinator;
use crate::download::download_to_memory;
use crate::links::DefaultLinks;
use crate::platform_names;
use crate::query::find_by_query;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub set_default: bool,
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = T>,
) -> Result<T, InstallationError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(InstallationError::Cancelled),
        output = future => Ok(output),
    }
}

pub struct Installer {
    paths: AppPaths,
    host: HostPlatform,
    coordinator: Arc<Coordinator>,
    links: DefaultLinks,
}

impl Installer {
    #[must_use]
    pub fn new(paths: AppPaths, host: HostPlatform, coordinator: Arc<Coordinator>) -> Self {
        let links = DefaultLinks::new(&paths, host.os);
        Self {
            paths,
            host,
            coordinator,
            links,
        }
    }

    #[must_use]
    pub fn links(&self) -> &DefaultLinks {
        &self.links
    }

    /// Resolve `query` against the fresh cached catalog, falling back to one
    /// remote listing, then install the match.
    ///
    /// # Errors
    /// Returns [`InstallationError::Resolution`] for invalid or unmatched
    /// queries, plus every error of [`Installer::install`].
    pub async fn install_by_query(
        &self,
        query: &[String],
        options: InstallOptions,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, InstallationError> {
        let cached = match self.coordinator.fresh_cached() {
            Some(catalog) => find_by_query(query, &catalog, self.host.os)?,
            None => None,
        };
        let release = match cached {
            Some(release) => release,
            None => {
                debug!("No cached match for {query:?}, fetching catalog");
                self.resolve_remote(query, cancel)
                    .await?
                    .ok_or_else(|| VersionResolutionError::not_found(query))?
            }
        };

        self.install(release, options, sink, cancel).await
    }

    async fn resolve_remote(
        &self,
        query: &[String],
        cancel: &CancellationToken,
    ) -> Result<Option<Release>, InstallationError> {
        let catalog = cancellable(cancel, self.coordinator.list_releases())
            .await?
            .map_err(|error| InstallationError::failed_from("catalog", error))?;
        Ok(find_by_query(query, &catalog, self.host.os)?)
    }

    /// Install one release. An existing install directory short-circuits to
    /// [`InstallOutcome::AlreadyInstalled`] without touching the network.
    ///
    /// # Errors
    /// Returns an error when the platform is unsupported, every source
    /// fails, the checksum does not match, extraction fails, linking fails,
    /// or `cancel` fires. Nothing is left on disk after a failure.
    pub async fn install(
        &self,
        release: Release,
        options: InstallOptions,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, InstallationError> {
        sink.report(&InstallProgress::Initializing);

        let release_dir = release.release_name_with_runtime();
        let target = self.paths.install_dir(&release_dir);
        if target.exists() {
            info!("{release_dir} is already installed");
            return Ok(InstallOutcome::AlreadyInstalled {
                release: release_dir,
                path: target,
            });
        }

        let release = platform_names::resolve_release(release, self.host)?;
        let filename = release
            .archive_file_name()
            .ok_or_else(|| InstallationError::failed("resolve", "release has no platform"))?;
        info!("Installing {release_dir} from {filename}");

        sink.report(&InstallProgress::Downloading {
            downloaded: 0,
            total: None,
            bytes_per_second: 0,
        });
        let archive = cancellable(cancel, self.coordinator.archive(&filename, &release)).await??;
        let bytes = download_to_memory(archive, sink, cancel).await?;

        let checksum = self.verify(&release, &filename, &bytes, sink, cancel).await?;

        sink.report(&InstallProgress::Extracting);
        match self
            .extract_and_link(&release, bytes, &target, options, sink)
            .await
        {
            Ok(default_link) => Ok(InstallOutcome::NewInstallation {
                release: release_dir,
                path: target,
                checksum,
                default_link,
            }),
            Err(error) => {
                warn!("Installation of {release_dir} failed, rolling back: {error}");
                if let Err(cleanup) = std::fs::remove_dir_all(&target)
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to remove {}: {cleanup}", target.display());
                }
                Err(error)
            }
        }
    }

    async fn verify(
        &self,
        release: &Release,
        filename: &str,
        bytes: &[u8],
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ChecksumStatus, InstallationError> {
        if !release.publishes_checksums() {
            debug!("No checksums are published for {}", release.release_name());
            return Ok(ChecksumStatus::SkippedByPolicy);
        }

        sink.report(&InstallProgress::VerifyingChecksum);
        let manifest = match cancellable(cancel, self.coordinator.checksum_manifest(release)).await? {
            Ok(manifest) => manifest,
            Err(error) => {
                warn!("Installing {filename} without checksum verification: {error}");
                return Ok(ChecksumStatus::Unavailable {
                    reason: error.to_string(),
                });
            }
        };

        let Some(expected) = parse_expected_checksum(&manifest, filename) else {
            warn!("Checksum manifest has no entry for {filename}");
            return Ok(ChecksumStatus::Unavailable {
                reason: format!("no checksum entry for {filename}"),
            });
        };

        let actual = sha512_hex(bytes);
        if !actual.eq_ignore_ascii_case(&expected) {
            return Err(InstallationError::ChecksumMismatch {
                expected,
                actual,
                filename: filename.to_string(),
            });
        }

        debug!("Checksum verified for {filename}");
        Ok(ChecksumStatus::Verified)
    }

    async fn extract_and_link(
        &self,
        release: &Release,
        bytes: Vec<u8>,
        target: &Path,
        options: InstallOptions,
        sink: &dyn ProgressSink,
    ) -> Result<Option<DefaultLinkStatus>, InstallationError> {
        std::fs::create_dir_all(target)
            .map_err(|error| InstallationError::failed_from("extract", error))?;

        let dest = target.to_path_buf();
        tokio::task::spawn_blocking(move || extract_zip(&bytes, &dest))
            .await
            .map_err(|error| InstallationError::failed_from("extract", error))?
            .map_err(|error| InstallationError::failed_from("extract", error))?;

        if !options.set_default {
            return Ok(None);
        }

        sink.report(&InstallProgress::SettingDefault);
        let executable = executable_path(release, target)?;
        match self.links.set_default(&executable) {
            Ok(status) => Ok(Some(status)),
            Err(error) => {
                self.links.clear_default();
                Err(invalid_link(error, &self.links.binary_link()).into())
            }
        }
    }
}

/// The path the default link targets for an installed release.
///
/// # Errors
/// Returns an error when the release carries no platform string.
pub fn executable_path(release: &Release, install_dir: &Path) -> Result<PathBuf, InstallationError> {
    release
        .executable_name()
        .map(|name| install_dir.join(name))
        .ok_or_else(|| InstallationError::failed("link", "release has no platform"))
}

fn invalid_link(error: SymlinkError, link: &Path) -> SymlinkError {
    match error {
        SymlinkError::Io { path, message, .. } => SymlinkError::invalid(path, message),
        SymlinkError::NoVersionSet => SymlinkError::invalid(link, "link was not created"),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use gdvm_backend::{Arch, HostPlatform, Os, Release, SymlinkError};

    use super::{executable_path, invalid_link};
    use crate::platform_names::resolve_release;

    #[test]
    fn executable_path_joins_install_dir() {
        let release = Release::parse("4.2-stable-mono", Os::Linux).expect("release should parse");
        let release = resolve_release(release, HostPlatform::new(Os::Linux, Arch::X64))
            .expect("platform should resolve");

        assert_eq!(
            executable_path(&release, Path::new("/gdvm/4.2-stable-mono")).expect("path"),
            Path::new("/gdvm/4.2-stable-mono/Godot_v4.2-stable_mono_linux.x86_64")
        );
    }

    #[test]
    fn executable_path_requires_platform() {
        let release = Release::parse("4.2-stable", Os::Linux).expect("release should parse");
        assert!(executable_path(&release, Path::new("/gdvm")).is_err());
    }

    #[test]
    fn link_io_errors_surface_as_invalid_symlink() {
        let error = invalid_link(
            SymlinkError::io(
                "/gdvm/bin/godot",
                &std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ),
            Path::new("/gdvm/bin/godot"),
        );
        assert!(matches!(error, SymlinkError::InvalidSymlink { .. }));

        let unsupported = invalid_link(
            SymlinkError::Unsupported { os: Os::Other },
            Path::new("/gdvm/bin/godot"),
        );
        assert_eq!(unsupported, SymlinkError::Unsupported { os: Os::Other });
    }
}
