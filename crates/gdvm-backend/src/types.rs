use gdvm_platform::Os;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const STABILITY_PREFIXES: [&str; 5] = ["stable", "rc", "beta", "alpha", "dev"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseType {
    Stable,
    Rc(u32),
    Beta(u32),
    Alpha(u32),
    Dev(u32),
}

impl ReleaseType {
    fn rank(self) -> (u8, u32) {
        match self {
            Self::Stable => (4, 0),
            Self::Rc(n) => (3, n),
            Self::Beta(n) => (2, n),
            Self::Alpha(n) => (1, n),
            Self::Dev(n) => (0, n),
        }
    }

    /// The bare stability keyword, without a sequence number.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Rc(_) => "rc",
            Self::Beta(_) => "beta",
            Self::Alpha(_) => "alpha",
            Self::Dev(_) => "dev",
        }
    }

    #[must_use]
    pub fn is_stable(self) -> bool {
        matches!(self, Self::Stable)
    }
}

/// Returns the stability keyword `segment` starts with, if any.
#[must_use]
pub fn stability_prefix(segment: &str) -> Option<&'static str> {
    let lower = segment.to_ascii_lowercase();
    STABILITY_PREFIXES
        .iter()
        .copied()
        .find(|prefix| lower.starts_with(prefix))
}

impl Ord for ReleaseType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for ReleaseType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => f.write_str("stable"),
            Self::Rc(n) | Self::Beta(n) | Self::Alpha(n) | Self::Dev(n) => {
                write!(f, "{}{n}", self.keyword())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid release type: {input}")]
pub struct ReleaseTypeParseError {
    pub input: String,
}

impl FromStr for ReleaseType {
    type Err = ReleaseTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let invalid = || ReleaseTypeParseError {
            input: s.to_string(),
        };

        if lower == "stable" {
            return Ok(Self::Stable);
        }

        let prefix = stability_prefix(&lower).ok_or_else(invalid)?;
        let number = parse_number(&lower[prefix.len()..])
            .filter(|n| *n > 0)
            .ok_or_else(invalid)?;

        match prefix {
            "rc" => Ok(Self::Rc(number)),
            "beta" => Ok(Self::Beta(number)),
            "alpha" => Ok(Self::Alpha(number)),
            "dev" => Ok(Self::Dev(number)),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Runtime {
    #[default]
    Standard,
    Mono,
}

impl Runtime {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Mono => "mono",
        }
    }

    #[must_use]
    pub fn is_mono(self) -> bool {
        matches!(self, Self::Mono)
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digits only; rejects signs and whitespace that `str::parse` would accept.
fn parse_number(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// One published engine build.
///
/// Values are only produced by [`Release::parse`]; the platform string is
/// attached later with [`Release::with_platform`], which returns a new value.
#[derive(Debug, Clone)]
pub struct Release {
    major: u32,
    minor: u32,
    patch: Option<u32>,
    release_type: ReleaseType,
    runtime: Runtime,
    platform: Option<String>,
    host_os: Os,
}

impl Release {
    /// Parse identifiers such as `4.2-stable`, `4.1.3-rc2-mono` or
    /// `3.5-stable-standard`.
    #[must_use]
    pub fn parse(token: &str, host_os: Os) -> Option<Self> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }

        let segments: Vec<&str> = trimmed.split(['-', '.']).collect();
        if segments.len() < 2 {
            return None;
        }

        let major = parse_number(segments[0]).filter(|major| *major > 0)?;
        let minor = parse_number(segments[1])?;
        let mut rest = &segments[2..];

        let patch = rest.first().and_then(|segment| parse_number(segment));
        if patch.is_some() {
            rest = &rest[1..];
        }

        let type_segment = rest
            .iter()
            .find(|segment| stability_prefix(segment).is_some())?;
        let release_type = type_segment.parse().ok()?;

        let runtime = if rest.iter().any(|s| s.eq_ignore_ascii_case("mono")) {
            Runtime::Mono
        } else {
            Runtime::Standard
        };

        Some(Self {
            major,
            minor,
            patch,
            release_type,
            runtime,
            platform: None,
            host_os,
        })
    }

    #[must_use]
    pub fn with_platform(self, platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_runtime(self, runtime: Runtime) -> Self {
        Self { runtime, ..self }
    }

    #[must_use]
    pub fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> u32 {
        self.minor
    }

    #[must_use]
    pub fn patch(&self) -> Option<u32> {
        self.patch
    }

    #[must_use]
    pub fn release_type(&self) -> ReleaseType {
        self.release_type
    }

    #[must_use]
    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    #[must_use]
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    #[must_use]
    pub fn host_os(&self) -> Os {
        self.host_os
    }

    /// Vendor checksums were first published with 3.3.
    #[must_use]
    pub fn publishes_checksums(&self) -> bool {
        (self.major, self.minor) >= (3, 3)
    }

    /// `4.2` or `4.2.1`.
    #[must_use]
    pub fn version(&self) -> String {
        match self.patch {
            Some(patch) => format!("{}.{}.{patch}", self.major, self.minor),
            None => format!("{}.{}", self.major, self.minor),
        }
    }

    /// `4.2-stable`, the name the catalog publishes.
    #[must_use]
    pub fn release_name(&self) -> String {
        format!("{}-{}", self.version(), self.release_type)
    }

    /// `4.2-stable-mono`, the name of the install directory.
    #[must_use]
    pub fn release_name_with_runtime(&self) -> String {
        format!("{}-{}", self.release_name(), self.runtime)
    }

    #[must_use]
    pub fn archive_file_name(&self) -> Option<String> {
        self.archive_stem().map(|stem| format!("{stem}.zip"))
    }

    fn archive_stem(&self) -> Option<String> {
        let platform = self.platform.as_deref()?;
        let stem = if self.major == 1 {
            format!(
                "Godot_v{}_{}_{platform}",
                self.version(),
                self.release_type
            )
        } else {
            format!("Godot_v{}_{platform}", self.release_name())
        };
        Some(stem)
    }

    /// Name of the runnable file or bundle inside the install directory.
    #[must_use]
    pub fn executable_name(&self) -> Option<String> {
        if self.host_os == Os::MacOs {
            let bundle = match self.runtime {
                Runtime::Standard => "Godot.app",
                Runtime::Mono => "Godot_mono.app",
            };
            return Some(bundle.to_string());
        }

        let stem = self.archive_stem()?;
        match (self.host_os, self.runtime) {
            (Os::Windows, Runtime::Mono) => Some(format!("{stem}.exe")),
            (Os::Linux, Runtime::Mono) => {
                // mono_linux_x86_64 ships mono_linux.x86_64
                let platform = self.platform.as_deref()?;
                let (os_part, arch_part) = platform.strip_prefix("mono_")?.split_once('_')?;
                let binary_platform = format!("mono_{os_part}.{arch_part}");
                Some(stem.replacen(platform, &binary_platform, 1))
            }
            _ => Some(stem),
        }
    }
}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then(self.release_type.cmp(&other.release_type))
            .then(self.runtime.cmp(&other.runtime))
            .then_with(|| {
                self.release_name_with_runtime()
                    .cmp(&other.release_name_with_runtime())
            })
    }
}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Release {}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.release_name_with_runtime())
    }
}
