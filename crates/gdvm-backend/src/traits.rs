use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::NetworkError;
use crate::types::Release;

/// A streamed archive body together with the length the transport declared.
pub struct ArchiveStream {
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, Result<Vec<u8>, NetworkError>>,
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Lists the release names a remote publishes, newest first.
#[async_trait]
pub trait ReleaseCatalog: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_release_names(&self) -> Result<Vec<String>, NetworkError>;
}

/// Serves the per-release files: checksum manifests and archives.
#[async_trait]
pub trait AssetSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_checksums(&self, release: &Release) -> Result<String, NetworkError>;

    async fn fetch_archive(
        &self,
        filename: &str,
        release: &Release,
    ) -> Result<ArchiveStream, NetworkError>;
}
