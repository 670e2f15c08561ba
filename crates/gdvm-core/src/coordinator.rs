//! Catalog listing and per-release asset retrieval across the primary
//! source and the mirror.

use std::sync::Arc;

use chrono::{Duration, Utc};
use gdvm_backend::{
    ArchiveStream, AssetSource, InstallationError, NetworkError, Os, Release, ReleaseCatalog,
};
use log::{debug, info, warn};

use crate::query::sort_newest_first;
use crate::release_cache::ReleaseCache;

pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

pub struct Coordinator {
    catalog: Arc<dyn ReleaseCatalog>,
    primary: Arc<dyn AssetSource>,
    secondary: Option<Arc<dyn AssetSource>>,
    cache: ReleaseCache,
    cache_ttl: Duration,
    host_os: Os,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn ReleaseCatalog>,
        primary: Arc<dyn AssetSource>,
        secondary: Option<Arc<dyn AssetSource>>,
        cache: ReleaseCache,
        host_os: Os,
    ) -> Self {
        Self {
            catalog,
            primary,
            secondary,
            cache,
            cache_ttl: Duration::hours(DEFAULT_CACHE_TTL_HOURS),
            host_os,
        }
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Fetch the catalog from the primary source and refresh the cache.
    /// The mirror publishes no listing, so there is no fallback.
    ///
    /// # Errors
    /// Returns the primary source's error.
    pub async fn list_releases(&self) -> Result<Vec<String>, NetworkError> {
        let names = self.catalog.list_release_names().await?;
        let names = sort_newest_first(names, self.host_os);
        info!(
            "Fetched {} releases from {}",
            names.len(),
            self.catalog.name()
        );

        if let Err(error) = self.cache.save(&names) {
            warn!(
                "Failed to write release cache {}: {error}",
                self.cache.path().display()
            );
        }
        Ok(names)
    }

    /// The cached catalog, if it is non-empty and younger than the cache TTL.
    #[must_use]
    pub fn fresh_cached(&self) -> Option<Vec<String>> {
        let cached = self.cache.load()?;
        if !cached.is_fresh(self.cache_ttl, Utc::now()) {
            debug!("Cached catalog is stale");
            return None;
        }
        debug!("Using cached catalog ({} releases)", cached.names.len());
        Some(cached.names)
    }

    /// The cached catalog while it is fresh, the remote one otherwise.
    ///
    /// # Errors
    /// Returns the primary source's error when a remote fetch is needed and
    /// fails.
    pub async fn cached_or_remote(&self, force_remote: bool) -> Result<Vec<String>, NetworkError> {
        if !force_remote && let Some(names) = self.fresh_cached() {
            return Ok(names);
        }

        self.list_releases().await
    }

    /// # Errors
    /// Returns the last source's error when every source fails.
    pub async fn checksum_manifest(&self, release: &Release) -> Result<String, NetworkError> {
        let primary_error = match self.primary.fetch_checksums(release).await {
            Ok(manifest) => return Ok(manifest),
            Err(error) => error,
        };
        warn!(
            "Checksum manifest for {} unavailable from {}: {primary_error}",
            release.release_name(),
            self.primary.name()
        );

        let Some(secondary) = &self.secondary else {
            return Err(primary_error);
        };
        secondary.fetch_checksums(release).await
    }

    /// # Errors
    /// Returns [`InstallationError::Failed`] when every source fails.
    pub async fn archive(
        &self,
        filename: &str,
        release: &Release,
    ) -> Result<ArchiveStream, InstallationError> {
        let primary_error = match self.primary.fetch_archive(filename, release).await {
            Ok(stream) => return Ok(stream),
            Err(error) => error,
        };
        warn!(
            "Download of {filename} from {} failed: {primary_error}",
            self.primary.name()
        );

        let Some(secondary) = &self.secondary else {
            return Err(InstallationError::failed_from("download", primary_error));
        };

        match secondary.fetch_archive(filename, release).await {
            Ok(stream) => {
                info!("Downloading {filename} from {}", secondary.name());
                Ok(stream)
            }
            Err(error) => {
                warn!(
                    "Download of {filename} from {} failed: {error}",
                    secondary.name()
                );
                Err(InstallationError::failed(
                    "download",
                    format!("{primary_error}; {error}"),
                ))
            }
        }
    }
}
