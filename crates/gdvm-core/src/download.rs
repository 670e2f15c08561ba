use std::time::Instant;

use futures_util::StreamExt;
use gdvm_backend::{ArchiveStream, InstallProgress, InstallationError, ProgressSink};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

/// Minimum number of bytes between two progress reports.
pub const PROGRESS_STEP: u64 = 1024 * 1024;

/// Pre-allocation ceiling for the in-memory buffer.
const MAX_PREALLOCATION: u64 = 512 * 1024 * 1024;

/// Collect an archive body into memory.
///
/// Progress is reported every [`PROGRESS_STEP`] bytes and once on
/// completion. Cancellation is checked before every chunk.
///
/// # Errors
/// Returns [`InstallationError::Cancelled`] when `cancel` fires and
/// [`InstallationError::Failed`] when the transport fails mid-stream.
pub async fn download_to_memory(
    archive: ArchiveStream,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, InstallationError> {
    let ArchiveStream {
        content_length,
        mut chunks,
    } = archive;

    let capacity = content_length
        .map(|length| length.min(MAX_PREALLOCATION))
        .and_then(|length| usize::try_from(length).ok())
        .unwrap_or_default();
    let mut buffer = Vec::with_capacity(capacity);

    let started = Instant::now();
    let mut downloaded: u64 = 0;
    let mut last_reported: u64 = 0;

    let report = |downloaded: u64| {
        let elapsed = started.elapsed().as_secs_f64();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let bytes_per_second = if elapsed > 0.0 {
            (downloaded as f64 / elapsed) as u64
        } else {
            downloaded
        };
        sink.report(&InstallProgress::Downloading {
            downloaded,
            total: content_length,
            bytes_per_second,
        });
    };

    loop {
        if cancel.is_cancelled() {
            debug!("Download cancelled after {downloaded} bytes");
            return Err(InstallationError::Cancelled);
        }

        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InstallationError::Cancelled),
            next = chunks.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };

        let chunk = chunk.map_err(|error| InstallationError::failed_from("download", error))?;
        buffer.extend_from_slice(&chunk);
        downloaded += chunk.len() as u64;

        if downloaded - last_reported >= PROGRESS_STEP {
            report(downloaded);
            last_reported = downloaded;
        }
    }

    if last_reported != downloaded || downloaded == 0 {
        report(downloaded);
    }

    info!("Download complete: {downloaded} bytes");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures_util::StreamExt;
    use gdvm_backend::{ArchiveStream, InstallProgress, InstallationError, NetworkError};
    use tokio_util::sync::CancellationToken;

    use super::{PROGRESS_STEP, download_to_memory};

    fn stream(chunks: Vec<Result<Vec<u8>, NetworkError>>, length: Option<u64>) -> ArchiveStream {
        ArchiveStream {
            content_length: length,
            chunks: futures_util::stream::iter(chunks).boxed(),
        }
    }

    fn downloaded_values(seen: &Mutex<Vec<InstallProgress>>) -> Vec<u64> {
        seen.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .filter_map(|progress| match progress {
                InstallProgress::Downloading { downloaded, .. } => Some(*downloaded),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn collects_chunks_and_reports_each_mebibyte() {
        let step = usize::try_from(PROGRESS_STEP).expect("step fits in usize");
        let chunks = vec![
            Ok(vec![1_u8; step / 2]),
            Ok(vec![2_u8; step / 2]),
            Ok(vec![3_u8; step / 4]),
        ];
        let total = (step + step / 4) as u64;
        let seen = Mutex::new(Vec::new());
        let sink = |progress: &InstallProgress| {
            seen.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(progress.clone());
        };

        let bytes = download_to_memory(stream(chunks, Some(total)), &sink, &CancellationToken::new())
            .await
            .expect("download should succeed");

        assert_eq!(bytes.len() as u64, total);
        assert_eq!(downloaded_values(&seen), vec![PROGRESS_STEP, total]);
    }

    #[tokio::test]
    async fn small_download_reports_once_on_completion() {
        let seen = Mutex::new(Vec::new());
        let sink = |progress: &InstallProgress| {
            seen.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(progress.clone());
        };

        let bytes = download_to_memory(
            stream(vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())], None),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .expect("download should succeed");

        assert_eq!(bytes, b"abcd");
        assert_eq!(downloaded_values(&seen), vec![4]);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_download() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = download_to_memory(
            stream(vec![Ok(b"ab".to_vec())], Some(2)),
            &gdvm_backend::NoProgress,
            &cancel,
        )
        .await;

        assert_eq!(result, Err(InstallationError::Cancelled));
    }

    #[tokio::test]
    async fn stream_errors_fail_the_download() {
        let result = download_to_memory(
            stream(
                vec![
                    Ok(b"ab".to_vec()),
                    Err(NetworkError::connection_failed("https://dl", "reset")),
                ],
                None,
            ),
            &gdvm_backend::NoProgress,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(InstallationError::Failed { phase: "download", .. })
        ));
    }
}
