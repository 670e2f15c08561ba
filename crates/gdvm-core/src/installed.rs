use gdvm_backend::{Os, Release};
use gdvm_platform::AppPaths;

/// Installed release directory names, newest and most stable first.
///
/// Only immediate subdirectories of the root that parse as a release are
/// counted; `bin` and hidden entries are skipped. A missing root is an
/// empty set.
///
/// # Errors
/// Returns an error when the root exists but cannot be read.
pub fn list_installed(paths: &AppPaths, host_os: Os) -> std::io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(&paths.root) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };

    let mut installed: Vec<(Release, String)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if AppPaths::is_reserved_entry(&name) {
            continue;
        }
        if let Some(release) = Release::parse(&name, host_os) {
            installed.push((release, name));
        }
    }

    installed.sort_by(|(a, _), (b, _)| b.cmp(a));
    Ok(installed.into_iter().map(|(_, name)| name).collect())
}

#[cfg(test)]
mod tests {
    use gdvm_backend::Os;
    use gdvm_platform::AppPaths;

    use super::list_installed;

    #[test]
    fn lists_release_directories_in_descending_order() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = AppPaths::with_root(temp.path());
        for dir in [
            "3.5-stable-standard",
            "4.2-stable-mono",
            "4.2-stable-standard",
            "4.2-rc1-standard",
            "bin",
            ".hidden-4.3-stable",
            "notes",
        ] {
            std::fs::create_dir_all(temp.path().join(dir)).expect("dir should be created");
        }
        std::fs::write(temp.path().join("4.4-stable-standard"), b"file")
            .expect("stray file should be written");

        let installed = list_installed(&paths, Os::Linux).expect("root should be readable");

        assert_eq!(
            installed,
            vec![
                "4.2-stable-mono",
                "4.2-stable-standard",
                "4.2-rc1-standard",
                "3.5-stable-standard",
            ]
        );
    }

    #[test]
    fn missing_root_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = AppPaths::with_root(temp.path().join("absent"));

        assert!(
            list_installed(&paths, Os::Linux)
                .expect("missing root is not an error")
                .is_empty()
        );
    }
}
