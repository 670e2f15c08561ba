//! HTTP release sources: the vendor's GitHub builds repository and the
//! archival mirror.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use gdvm_backend::{ArchiveStream, AssetSource, NetworkError, Release, ReleaseCatalog};
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::checksum::MANIFEST_FILE;

pub const DEFAULT_CATALOG_API_URL: &str =
    "https://api.github.com/repos/godotengine/godot-builds/contents/releases";
pub const DEFAULT_PRIMARY_BASE_URL: &str =
    "https://github.com/godotengine/godot-builds/releases/download";
pub const DEFAULT_MIRROR_BASE_URL: &str = "https://downloads.tuxfamily.org/godotengine";

const CATALOG_ENTRY_PREFIX: &str = "godot-";
const CATALOG_ENTRY_SUFFIX: &str = ".json";

/// Build the client shared by all sources.
///
/// Only the connect phase is bounded; archive bodies can take arbitrarily
/// long.
///
/// # Errors
/// Returns an error when the TLS backend cannot be initialized.
pub fn build_http_client(connect_timeout: Duration) -> Result<Client, NetworkError> {
    Client::builder()
        .user_agent(concat!("gdvm/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|error| NetworkError::connection_failed_from("http client", error))
}

async fn send(request: RequestBuilder, url: &str) -> Result<Response, NetworkError> {
    debug!("GET {url}");
    let response = request
        .send()
        .await
        .map_err(|error| NetworkError::connection_failed_from(url, error))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::request_failed(url, status.as_u16()));
    }
    Ok(response)
}

fn archive_stream(response: Response, url: String) -> ArchiveStream {
    let content_length = response.content_length();
    let chunks = response
        .bytes_stream()
        .map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|error| NetworkError::connection_failed_from(url.as_str(), error))
        })
        .boxed();

    ArchiveStream {
        content_length,
        chunks,
    }
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
}

fn release_name_from_entry(entry: &str) -> Option<&str> {
    entry
        .strip_prefix(CATALOG_ENTRY_PREFIX)?
        .strip_suffix(CATALOG_ENTRY_SUFFIX)
}

/// The vendor's builds repository: a contents listing of
/// `godot-<name>.json` files and per-release download assets.
pub struct GithubSource {
    client: Client,
    api_url: String,
    download_base: String,
    token: Option<String>,
}

impl GithubSource {
    #[must_use]
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        download_base: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            download_base: download_base.into(),
            token,
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn asset_url(&self, release: &Release, filename: &str) -> String {
        format!(
            "{}/{}/{filename}",
            self.download_base.trim_end_matches('/'),
            release.release_name()
        )
    }
}

#[async_trait]
impl ReleaseCatalog for GithubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list_release_names(&self) -> Result<Vec<String>, NetworkError> {
        let request = self
            .get(&self.api_url)
            .header(ACCEPT, "application/vnd.github+json");
        let response = send(request, &self.api_url).await?;
        let entries: Vec<ContentEntry> = response
            .json()
            .await
            .map_err(|error| NetworkError::connection_failed_from(self.api_url.as_str(), error))?;

        Ok(entries
            .iter()
            .filter_map(|entry| release_name_from_entry(&entry.name))
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl AssetSource for GithubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_checksums(&self, release: &Release) -> Result<String, NetworkError> {
        let url = self.asset_url(release, MANIFEST_FILE);
        let response = send(self.get(&url), &url).await?;
        response
            .text()
            .await
            .map_err(|error| NetworkError::connection_failed_from(url.as_str(), error))
    }

    async fn fetch_archive(
        &self,
        filename: &str,
        release: &Release,
    ) -> Result<ArchiveStream, NetworkError> {
        let url = self.asset_url(release, filename);
        let response = send(self.get(&url), &url).await?;
        Ok(archive_stream(response, url))
    }
}

/// The archival mirror. Laid out as
/// `<base>/<version>[/<type>][/mono]/<file>`, with the type directory
/// omitted for stable releases. It publishes no listing.
pub struct MirrorSource {
    client: Client,
    base_url: String,
}

impl MirrorSource {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn asset_url(&self, release: &Release, filename: &str) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            release.version()
        );
        if !release.release_type().is_stable() {
            url.push('/');
            url.push_str(&release.release_type().to_string());
        }
        if release.runtime().is_mono() {
            url.push_str("/mono");
        }
        url.push('/');
        url.push_str(filename);
        url
    }
}

#[async_trait]
impl AssetSource for MirrorSource {
    fn name(&self) -> &'static str {
        "mirror"
    }

    async fn fetch_checksums(&self, release: &Release) -> Result<String, NetworkError> {
        let url = self.asset_url(release, MANIFEST_FILE);
        let response = send(self.client.get(&url), &url).await?;
        response
            .text()
            .await
            .map_err(|error| NetworkError::connection_failed_from(url.as_str(), error))
    }

    async fn fetch_archive(
        &self,
        filename: &str,
        release: &Release,
    ) -> Result<ArchiveStream, NetworkError> {
        let url = self.asset_url(release, filename);
        let response = send(self.client.get(&url), &url).await?;
        Ok(archive_stream(response, url))
    }
}

#[cfg(test)]
mod tests {
    use gdvm_backend::{Os, Release};
    use reqwest::Client;

    use super::{GithubSource, MirrorSource, release_name_from_entry};

    fn release(token: &str) -> Release {
        Release::parse(token, Os::Linux).expect("release should parse")
    }

    #[test]
    fn catalog_entries_map_to_release_names() {
        assert_eq!(release_name_from_entry("godot-4.2-stable.json"), Some("4.2-stable"));
        assert_eq!(release_name_from_entry("godot-3.1.2-rc1.json"), Some("3.1.2-rc1"));
        assert_eq!(release_name_from_entry("README.md"), None);
        assert_eq!(release_name_from_entry("godot-4.2-stable.txt"), None);
    }

    #[test]
    fn github_assets_live_under_release_name() {
        let source = GithubSource::new(Client::new(), "https://api", "https://dl/", None);
        assert_eq!(
            source.asset_url(&release("4.2-stable-mono"), "SHA512-SUMS.txt"),
            "https://dl/4.2-stable/SHA512-SUMS.txt"
        );
    }

    #[test]
    fn mirror_omits_type_directory_for_stable() {
        let mirror = MirrorSource::new(Client::new(), "https://mirror");
        assert_eq!(
            mirror.asset_url(&release("4.2-stable"), "a.zip"),
            "https://mirror/4.2/a.zip"
        );
        assert_eq!(
            mirror.asset_url(&release("4.2-stable-mono"), "a.zip"),
            "https://mirror/4.2/mono/a.zip"
        );
        assert_eq!(
            mirror.asset_url(&release("3.1.2-rc1-mono"), "a.zip"),
            "https://mirror/3.1.2/rc1/mono/a.zip"
        );
    }
}
