use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ArchiveError {
    fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::Io {
            context,
            source: std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        }
    }

    fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }
}

/// The directory every entry sits under, when there is exactly one and it
/// is not an application bundle.
fn common_leading_dir(names: &[PathBuf]) -> Option<PathBuf> {
    let mut leading: Option<&std::ffi::OsStr> = None;
    let mut nested = false;

    for name in names {
        let mut components = name.components();
        let Some(Component::Normal(first)) = components.next() else {
            return None;
        };
        match leading {
            Some(existing) if existing != first => return None,
            _ => leading = Some(first),
        }
        nested |= components.next().is_some();
    }

    let leading = leading?;
    if !nested || Path::new(leading).extension().is_some_and(|ext| ext == "app") {
        return None;
    }
    Some(PathBuf::from(leading))
}

/// Extract an in-memory zip into `dest`, dropping a single common leading
/// directory. Entries whose paths escape `dest` are skipped.
///
/// # Errors
/// Returns an error when the archive is unreadable or a file cannot be
/// written.
pub fn extract_zip(bytes: &[u8], dest: &Path) -> Result<(), ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| ArchiveError::zip("failed to read zip archive", error))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|error| ArchiveError::zip("failed to read zip entry", error))?;
        names.push(entry.enclosed_name());
    }

    let safe_names: Vec<PathBuf> = names.iter().flatten().cloned().collect();
    let strip = common_leading_dir(&safe_names);
    if let Some(strip) = &strip {
        debug!("Flattening leading directory {}", strip.display());
    }

    for (i, name) in names.into_iter().enumerate() {
        let Some(name) = name else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let relative = match &strip {
            Some(prefix) => match name.strip_prefix(prefix) {
                Ok(rest) if rest.as_os_str().is_empty() => continue,
                Ok(rest) => rest.to_path_buf(),
                Err(_) => name,
            },
            None => name,
        };
        let out_path = dest.join(&relative);

        let mut entry = archive
            .by_index(i)
            .map_err(|error| ArchiveError::zip("failed to read zip entry", error))?;

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                ArchiveError::io_with_path("failed to create extraction directory", &out_path, &error)
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                ArchiveError::io_with_path(
                    "failed to create extraction parent directory",
                    parent,
                    &error,
                )
            })?;
        }
        let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
            ArchiveError::io_with_path("failed to create extracted file", &out_path, &error)
        })?;
        std::io::copy(&mut entry, &mut outfile).map_err(|error| {
            ArchiveError::io_with_path("failed to extract archive entry", &out_path, &error)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}
