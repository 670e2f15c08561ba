//! The entry point a command-line front end drives.

use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Duration;

use gdvm_backend::{
    AssetSource, DefaultLinkStatus, HostPlatform, InstallOutcome, InstallationError,
    NetworkError, ProgressSink, Release, SymlinkError, VersionResolutionError,
};
use gdvm_platform::{AppPaths, AppPathsError};
use log::{info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::coordinator::Coordinator;
use crate::install::{InstallOptions, Installer, executable_path};
use crate::installed::list_installed;
use crate::lock::RootLock;
use crate::platform_names;
use crate::logging;
use crate::query::{
    SortOrder, explicit_runtime, filter_by_query, find_compatible, is_latest_token, normalize,
    validate_tokens,
};
use crate::release_cache::ReleaseCache;
use crate::settings::{Settings, SettingsError};
use crate::sources::{GithubSource, MirrorSource, build_http_client};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Installation(#[from] InstallationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Symlink(#[from] SymlinkError),

    #[error(transparent)]
    Resolution(#[from] VersionResolutionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ManagerError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

fn acquire_lock(paths: &AppPaths) -> Result<RootLock, InstallationError> {
    RootLock::acquire(paths).map_err(|error| InstallationError::failed_from("lock", error))
}

pub struct VersionManager {
    paths: AppPaths,
    host: HostPlatform,
    settings: Settings,
    coordinator: Arc<Coordinator>,
    installer: Installer,
}

impl VersionManager {
    /// Resolve the managed root from the environment and load its settings.
    ///
    /// # Errors
    /// Returns an error when the home directory is unknown, the settings
    /// are invalid, or the HTTP client cannot be built.
    pub fn from_environment() -> Result<Self, ManagerError> {
        let paths = AppPaths::new()?;
        let settings = Settings::load(&paths)?;
        Self::new(paths, HostPlatform::current(), settings)
    }

    /// Wire the vendor sources described by `settings`.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(paths: AppPaths, host: HostPlatform, settings: Settings) -> Result<Self, ManagerError> {
        let client = build_http_client(Duration::from_secs(settings.http_timeout_secs))?;

        let github = Arc::new(GithubSource::new(
            client.clone(),
            settings.catalog_api_url.clone(),
            settings.primary_base_url.clone(),
            settings.github_token.clone(),
        ));
        let mirror = settings
            .mirror_base_url
            .clone()
            .map(|base| Arc::new(MirrorSource::new(client, base)) as Arc<dyn AssetSource>);

        let coordinator = Coordinator::new(
            github.clone(),
            github,
            mirror,
            ReleaseCache::new(paths.release_cache_file()),
            host.os,
        )
        .with_cache_ttl(settings.cache_ttl());

        Ok(Self::with_coordinator(paths, host, settings, coordinator))
    }

    #[must_use]
    pub fn with_coordinator(
        paths: AppPaths,
        host: HostPlatform,
        settings: Settings,
        coordinator: Coordinator,
    ) -> Self {
        let coordinator = Arc::new(coordinator);
        let installer = Installer::new(paths.clone(), host, Arc::clone(&coordinator));
        Self {
            paths,
            host,
            settings,
            coordinator,
            installer,
        }
    }

    #[must_use]
    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    #[must_use]
    pub fn host(&self) -> HostPlatform {
        self.host
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Start writing `<root>/gdvm.log` with the level and size cap from the
    /// loaded settings. Returns `false` when a logger was already installed.
    pub fn init_logging(&self) -> bool {
        logging::init_logging(
            &self.paths,
            self.settings.debug_logging,
            self.settings.max_log_size_bytes,
        )
    }

    /// # Errors
    /// Returns an error when the managed root cannot be read.
    pub fn list_installed(&self) -> Result<Vec<String>, ManagerError> {
        list_installed(&self.paths, self.host.os)
            .map_err(|error| ManagerError::io("failed to read managed root", error))
    }

    /// # Errors
    /// Returns the primary source's error when a remote fetch fails.
    pub async fn list_remote(&self, force_remote: bool) -> Result<Vec<String>, ManagerError> {
        Ok(self.coordinator.cached_or_remote(force_remote).await?)
    }

    /// # Errors
    /// Returns the primary source's error when a remote fetch fails.
    pub async fn search_remote(
        &self,
        query: &[String],
        order: SortOrder,
    ) -> Result<Vec<String>, ManagerError> {
        let catalog = self.coordinator.cached_or_remote(false).await?;
        Ok(filter_by_query(query, &catalog, order, self.host.os))
    }

    /// # Errors
    /// See [`Installer::install_by_query`]; lock contention is reported as
    /// [`InstallationError::Failed`].
    pub async fn install(
        &self,
        query: &[String],
        options: InstallOptions,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, ManagerError> {
        let _lock = acquire_lock(&self.paths)?;
        let outcome = self
            .installer
            .install_by_query(query, options, sink, cancel)
            .await?;
        info!("{} is ready at {}", outcome.release(), outcome.path().display());
        Ok(outcome)
    }

    fn installed_dir(&self, name: &str) -> Result<std::path::PathBuf, InstallationError> {
        let not_found = || InstallationError::NotFound {
            release: name.to_string(),
        };
        let mut components = Path::new(name).components();
        let single_component = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_component || AppPaths::is_reserved_entry(name) {
            return Err(not_found());
        }

        let dir = self.paths.install_dir(name);
        if dir.is_dir() { Ok(dir) } else { Err(not_found()) }
    }

    fn remove_installed(&self, name: &str) -> Result<(), ManagerError> {
        let dir = self.installed_dir(name)?;

        let links = self.installer.links();
        if links.points_into(&dir) {
            info!("Clearing default version, it pointed at {name}");
            links.clear_default();
        }

        std::fs::remove_dir_all(&dir)
            .map_err(|error| ManagerError::io("failed to remove installation", error))?;
        info!("Uninstalled {name}");
        Ok(())
    }

    /// Remove an installed release by directory name.
    ///
    /// # Errors
    /// Returns [`InstallationError::NotFound`] when nothing by that name is
    /// installed.
    pub fn uninstall(&self, name: &str) -> Result<(), ManagerError> {
        let _lock = acquire_lock(&self.paths)?;
        self.remove_installed(name)
    }

    /// Remove every installed release matching `query`; returns the removed
    /// names. A `mono` or `standard` token restricts removal to that runtime.
    ///
    /// # Errors
    /// Returns [`VersionResolutionError::InvalidVersion`] for an empty query,
    /// unrecognized tokens or `latest`, and [`InstallationError::NotFound`]
    /// when nothing matches.
    pub fn uninstall_matching(&self, query: &[String]) -> Result<Vec<String>, ManagerError> {
        let tokens = normalize(query);
        if tokens.is_empty() {
            return Err(VersionResolutionError::InvalidVersion { tokens: Vec::new() }.into());
        }
        let mut invalid = validate_tokens(&tokens);
        invalid.extend(tokens.iter().filter(|token| is_latest_token(token)).cloned());
        if !invalid.is_empty() {
            return Err(VersionResolutionError::InvalidVersion { tokens: invalid }.into());
        }
        let runtime = explicit_runtime(&tokens);

        let _lock = acquire_lock(&self.paths)?;
        let installed = self.list_installed()?;
        let matches: Vec<String> =
            filter_by_query(query, &installed, SortOrder::StabilityFirst, self.host.os)
                .into_iter()
                .filter(|name| {
                    runtime.is_none_or(|runtime| {
                        Release::parse(name, self.host.os)
                            .is_some_and(|release| release.runtime() == runtime)
                    })
                })
                .collect();
        if matches.is_empty() {
            return Err(InstallationError::NotFound {
                release: query.join(" "),
            }
            .into());
        }

        for name in &matches {
            self.remove_installed(name)?;
        }
        Ok(matches)
    }

    /// # Errors
    /// Returns [`InstallationError::NotFound`] for unknown names and the
    /// link error when the links cannot be created.
    pub fn set_default(&self, name: &str) -> Result<DefaultLinkStatus, ManagerError> {
        let dir = self.installed_dir(name)?;
        let release = Release::parse(name, self.host.os).ok_or_else(|| {
            InstallationError::NotFound {
                release: name.to_string(),
            }
        })?;
        let release = platform_names::resolve_release(release, self.host)
            .map_err(InstallationError::from)?;
        let executable = executable_path(&release, &dir)?;

        let links = self.installer.links();
        match links.set_default(&executable) {
            Ok(status) => Ok(status),
            Err(error) => {
                links.clear_default();
                Err(error.into())
            }
        }
    }

    /// The installed release the default link points into, if any.
    ///
    /// # Errors
    /// Returns [`SymlinkError::InvalidSymlink`] when the link dangles or
    /// points outside the managed root.
    pub fn current_default(&self) -> Result<Option<String>, ManagerError> {
        let info = match self.installer.links().resolve_default() {
            Ok(info) => info,
            Err(SymlinkError::NoVersionSet) => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let target = info.bundle_target.as_ref().unwrap_or(&info.target);
        let name = Some(target)
            .filter(|target| self.paths.contains(target))
            .and_then(|target| target.strip_prefix(&self.paths.root).ok())
            .and_then(|relative| relative.components().next())
            .and_then(|component| match component {
                Component::Normal(name) => name.to_str(),
                _ => None,
            });

        match name {
            Some(name) => Ok(Some(name.to_string())),
            None => {
                warn!("Default link points outside {}", self.paths.root.display());
                Err(SymlinkError::invalid(&info.link, "target is outside the managed root").into())
            }
        }
    }

    /// The best installed release for a project declaring
    /// `project_version`.
    ///
    /// # Errors
    /// Returns an error when the managed root cannot be read.
    pub fn resolve_for_project(
        &self,
        project_version: &str,
        is_dotnet: bool,
    ) -> Result<Option<String>, ManagerError> {
        let installed = self.list_installed()?;
        Ok(find_compatible(
            project_version,
            is_dotnet,
            &installed,
            self.host.os,
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use gdvm_backend::{
        Arch, ArchiveStream, AssetSource, HostPlatform, InstallationError, NetworkError, Os,
        Release, ReleaseCatalog, VersionResolutionError,
    };
    use gdvm_platform::AppPaths;

    use super::{ManagerError, VersionManager};
    use crate::coordinator::Coordinator;
    use crate::release_cache::ReleaseCache;
    use crate::settings::Settings;

    struct Offline;

    #[async_trait]
    impl ReleaseCatalog for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn list_release_names(&self) -> Result<Vec<String>, NetworkError> {
            Err(NetworkError::connection_failed("offline", "no network in tests"))
        }
    }

    #[async_trait]
    impl AssetSource for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn fetch_checksums(&self, _release: &Release) -> Result<String, NetworkError> {
            Err(NetworkError::connection_failed("offline", "no network in tests"))
        }

        async fn fetch_archive(
            &self,
            _filename: &str,
            _release: &Release,
        ) -> Result<ArchiveStream, NetworkError> {
            Err(NetworkError::connection_failed("offline", "no network in tests"))
        }
    }

    const LINUX_X64: HostPlatform = HostPlatform {
        os: Os::Linux,
        arch: Arch::X64,
    };

    fn manager(temp: &tempfile::TempDir) -> VersionManager {
        manager_with_settings(temp, Settings::default())
    }

    fn manager_with_settings(temp: &tempfile::TempDir, settings: Settings) -> VersionManager {
        let paths = AppPaths::with_root(temp.path());
        let offline = Arc::new(Offline);
        let coordinator = Coordinator::new(
            offline.clone(),
            offline,
            None,
            ReleaseCache::new(paths.release_cache_file()),
            Os::Linux,
        );
        VersionManager::with_coordinator(paths, LINUX_X64, settings, coordinator)
    }

    fn fake_install(manager: &VersionManager, name: &str) {
        let release = Release::parse(name, Os::Linux).expect("release should parse");
        let release = crate::platform_names::resolve_release(release, LINUX_X64)
            .expect("platform should resolve");
        let dir = manager.paths().install_dir(name);
        std::fs::create_dir_all(&dir).expect("install dir should be created");
        let executable = release.executable_name().expect("executable name");
        std::fs::write(dir.join(executable), b"elf").expect("binary should be written");
    }

    #[test]
    fn set_default_and_current_default_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager(&temp);
        fake_install(&manager, "4.2-stable-mono");

        assert_eq!(manager.current_default().expect("no link yet"), None);

        manager
            .set_default("4.2-stable-mono")
            .expect("default should be set");
        assert_eq!(
            manager.current_default().expect("link should resolve"),
            Some("4.2-stable-mono".to_string())
        );
    }

    #[test]
    fn uninstall_clears_default_pointing_at_removed_release() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager(&temp);
        fake_install(&manager, "4.2-stable-standard");
        fake_install(&manager, "4.1-stable-standard");
        manager
            .set_default("4.2-stable-standard")
            .expect("default should be set");

        manager
            .uninstall("4.1-stable-standard")
            .expect("uninstall should succeed");
        assert_eq!(
            manager.current_default().expect("link should survive"),
            Some("4.2-stable-standard".to_string())
        );

        manager
            .uninstall("4.2-stable-standard")
            .expect("uninstall should succeed");
        assert_eq!(manager.current_default().expect("link cleared"), None);
        assert!(manager.list_installed().expect("root readable").is_empty());
    }

    #[test]
    fn uninstall_unknown_or_reserved_names_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager(&temp);
        std::fs::create_dir_all(manager.paths().bin_dir()).expect("bin should be created");

        for name in ["4.2-stable-standard", "bin", "../escape", ".releases"] {
            assert!(
                matches!(
                    manager.uninstall(name),
                    Err(ManagerError::Installation(InstallationError::NotFound { .. }))
                ),
                "{name}"
            );
        }
        assert!(manager.paths().bin_dir().is_dir());
    }

    #[test]
    fn uninstall_matching_removes_every_match() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager(&temp);
        for name in ["4.2-stable-standard", "4.2-stable-mono", "3.5-stable-standard"] {
            fake_install(&manager, name);
        }

        let query = vec!["4.2".to_string()];
        let removed = manager
            .uninstall_matching(&query)
            .expect("matches should be removed");

        assert_eq!(removed.len(), 2);
        assert_eq!(
            manager.list_installed().expect("root readable"),
            vec!["3.5-stable-standard"]
        );
        assert!(manager.uninstall_matching(&query).is_err());
    }

    #[test]
    fn uninstall_matching_rejects_queries_that_select_everything() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager(&temp);
        for name in ["4.2-stable-standard", "4.2-stable-mono", "3.5-stable-standard"] {
            fake_install(&manager, name);
        }

        assert!(matches!(
            manager.uninstall_matching(&[]),
            Err(ManagerError::Resolution(VersionResolutionError::InvalidVersion { ref tokens }))
                if tokens.is_empty()
        ));
        assert!(matches!(
            manager.uninstall_matching(&["latest".to_string()]),
            Err(ManagerError::Resolution(VersionResolutionError::InvalidVersion { ref tokens }))
                if tokens == &["latest".to_string()]
        ));
        assert!(matches!(
            manager.uninstall_matching(&["4.2".to_string(), "x86".to_string()]),
            Err(ManagerError::Resolution(VersionResolutionError::InvalidVersion { .. }))
        ));
        assert_eq!(manager.list_installed().expect("root readable").len(), 3);
    }

    #[test]
    fn uninstall_matching_honours_runtime_tokens() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager(&temp);
        for name in ["4.2-stable-standard", "4.2-stable-mono", "3.5-stable-standard"] {
            fake_install(&manager, name);
        }

        let removed = manager
            .uninstall_matching(&["4.2".to_string(), "mono".to_string()])
            .expect("mono build should be removed");
        assert_eq!(removed, vec!["4.2-stable-mono"]);
        assert_eq!(
            manager.list_installed().expect("root readable"),
            vec!["4.2-stable-standard", "3.5-stable-standard"]
        );

        let removed = manager
            .uninstall_matching(&["3.5-stable-standard".to_string()])
            .expect("standard build should be removed");
        assert_eq!(removed, vec!["3.5-stable-standard"]);
        assert_eq!(
            manager.list_installed().expect("root readable"),
            vec!["4.2-stable-standard"]
        );
    }

    #[test]
    fn init_logging_applies_log_size_from_settings() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager_with_settings(
            &temp,
            Settings {
                debug_logging: true,
                max_log_size_bytes: 16,
                ..Settings::default()
            },
        );
        let log_file = manager.paths().log_file();
        std::fs::write(&log_file, "old-1
old-2
old-3
old-4
newest
")
            .expect("log should be seeded");

        manager.init_logging();

        let contents = std::fs::read_to_string(&log_file).expect("log should be readable");
        assert!(contents.starts_with("newest\n"), "{contents}");
        assert!(!contents.contains("old-1"));
        assert!(manager.paths().bin_dir().is_dir());
    }

    #[test]
    fn resolve_for_project_uses_installed_releases() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let manager = manager(&temp);
        for name in ["4.3-rc1-standard", "4.3-stable-standard", "4.3-stable-mono"] {
            fake_install(&manager, name);
        }

        assert_eq!(
            manager.resolve_for_project("4.3", false).expect("resolved"),
            Some("4.3-stable-standard".to_string())
        );
        assert_eq!(
            manager.resolve_for_project("4.3", true).expect("resolved"),
            Some("4.3-stable-mono".to_string())
        );
        assert_eq!(manager.resolve_for_project("5.0", false).expect("resolved"), None);
    }
}
