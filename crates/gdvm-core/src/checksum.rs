use sha2::{Digest, Sha512};

/// Name of the manifest published next to each release's archives.
pub const MANIFEST_FILE: &str = "SHA512-SUMS.txt";

/// Look up `filename` in a `<hex-hash>  <filename>` manifest.
#[must_use]
pub fn parse_expected_checksum(manifest: &str, filename: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts.next()?;
        if name == filename {
            Some(hash.to_ascii_lowercase())
        } else {
            None
        }
    })
}

#[must_use]
pub fn sha512_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
