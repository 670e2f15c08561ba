use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

/// The newline-delimited remote catalog kept at `<root>/.releases`,
/// newest first.
#[derive(Debug, Clone)]
pub struct ReleaseCache {
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCatalog {
    pub names: Vec<String>,
    pub modified: DateTime<Utc>,
}

impl CachedCatalog {
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        !self.names.is_empty() && now.signed_duration_since(self.modified) < ttl
    }
}

impl ReleaseCache {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the file is missing or unreadable.
    #[must_use]
    pub fn load(&self) -> Option<CachedCatalog> {
        let modified = std::fs::metadata(&self.path).ok()?.modified().ok()?;
        let data = std::fs::read_to_string(&self.path).ok()?;
        let names = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Some(CachedCatalog {
            names,
            modified: DateTime::<Utc>::from(modified),
        })
    }

    /// Replace the cache file. Concurrent writers race; the last rename
    /// wins.
    ///
    /// # Errors
    /// Returns an error when the temporary file cannot be written or
    /// renamed into place.
    pub fn save(&self, names: &[String]) -> std::io::Result<()> {
        let mut data = names.join("\n");
        data.push('\n');
        write_atomic(&self.path, data.as_bytes())
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "cache path has no parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("releases");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!("{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique cache temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{CachedCatalog, ReleaseCache};

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn save_and_load_preserve_order() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let cache = ReleaseCache::new(temp_dir.path().join(".releases"));

        cache
            .save(&names(&["4.2-stable", "4.1-rc2", "3.5-stable"]))
            .expect("cache should be written");
        let loaded = cache.load().expect("cache should load");

        assert_eq!(loaded.names, names(&["4.2-stable", "4.1-rc2", "3.5-stable"]));
        let written =
            std::fs::read_to_string(cache.path()).expect("cache file should be readable");
        assert_eq!(written, "4.2-stable\n4.1-rc2\n3.5-stable\n");
    }

    #[test]
    fn save_replaces_existing_file_and_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let cache = ReleaseCache::new(temp_dir.path().join(".releases"));

        cache.save(&names(&["4.1-stable"])).expect("first write");
        cache.save(&names(&["4.2-stable"])).expect("second write");

        let loaded = cache.load().expect("cache should load");
        assert_eq!(loaded.names, names(&["4.2-stable"]));

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .expect("directory should be readable")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![".releases".to_string()]);
    }

    #[test]
    fn missing_cache_loads_as_none() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let cache = ReleaseCache::new(temp_dir.path().join(".releases"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn freshness_requires_names_and_recent_write() {
        let now = Utc::now();
        let ttl = Duration::hours(24);

        let recent = CachedCatalog {
            names: names(&["4.2-stable"]),
            modified: now - Duration::hours(1),
        };
        assert!(recent.is_fresh(ttl, now));

        let stale = CachedCatalog {
            modified: now - Duration::hours(25),
            ..recent.clone()
        };
        assert!(!stale.is_fresh(ttl, now));

        let empty = CachedCatalog {
            names: Vec::new(),
            ..recent
        };
        assert!(!empty.is_fresh(ttl, now));
    }
}
