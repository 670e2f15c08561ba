use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Os {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "linux") {
            Os::Linux
        } else {
            Os::Other
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Os::Windows => "Windows",
            Os::MacOs => "macOS",
            Os::Linux => "Linux",
            Os::Other => "unknown",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    X86,
    X64,
    Arm32,
    Arm64,
    Other,
}

impl Arch {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Arch::X64
        } else if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "aarch64") {
            Arch::Arm64
        } else if cfg!(target_arch = "arm") {
            Arch::Arm32
        } else {
            Arch::Other
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X86 => "x86",
            Arch::X64 => "x64",
            Arch::Arm32 => "arm32",
            Arch::Arm64 => "arm64",
            Arch::Other => "unknown",
        };
        f.write_str(name)
    }
}

/// Operating system and CPU architecture of the machine releases are
/// installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostPlatform {
    pub os: Os,
    pub arch: Arch,
}

impl HostPlatform {
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    #[must_use]
    pub fn current() -> Self {
        Self::new(Os::current(), Arch::current())
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::{Arch, HostPlatform, Os};

    #[test]
    fn current_host_matches_compile_target() {
        let host = HostPlatform::current();

        #[cfg(target_os = "linux")]
        assert_eq!(host.os, Os::Linux);
        #[cfg(target_os = "macos")]
        assert_eq!(host.os, Os::MacOs);
        #[cfg(target_os = "windows")]
        assert_eq!(host.os, Os::Windows);

        #[cfg(target_arch = "x86_64")]
        assert_eq!(host.arch, Arch::X64);
        #[cfg(target_arch = "aarch64")]
        assert_eq!(host.arch, Arch::Arm64);
    }

    #[test]
    fn display_joins_os_and_arch() {
        let host = HostPlatform::new(Os::MacOs, Arch::Arm64);
        assert_eq!(host.to_string(), "macOS/arm64");
    }
}
