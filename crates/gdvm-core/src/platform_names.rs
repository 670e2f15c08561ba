//! Vendor asset naming per operating system, CPU architecture, engine
//! version and runtime.
//!
//! The tables below carry the naming history of the published archives
//! as-is; each arm is one published combination.

use gdvm_backend::{Arch, HostPlatform, Os, PlatformError, Release, Runtime};

/// Resolve the platform string used in archive names for `release` on
/// `host`.
///
/// # Errors
/// Returns [`PlatformError::Unsupported`] when no build is published for the
/// combination.
pub fn resolve(release: &Release, host: HostPlatform) -> Result<String, PlatformError> {
    let version = (release.major(), release.minor());
    let name = match host.os {
        Os::MacOs => macos(release.runtime(), version, host.arch),
        Os::Linux => linux(release.runtime(), version, host.arch),
        Os::Windows => windows(release.runtime(), version, host.arch),
        Os::Other => None,
    };

    name.map(str::to_string)
        .ok_or_else(|| PlatformError::Unsupported {
            release: release.release_name_with_runtime(),
            os: host.os,
            arch: host.arch,
        })
}

/// Resolve and attach the platform string, producing the value the
/// installer works with.
///
/// # Errors
/// See [`resolve`].
pub fn resolve_release(release: Release, host: HostPlatform) -> Result<Release, PlatformError> {
    let platform = resolve(&release, host)?;
    Ok(release.with_platform(platform))
}

fn from_4_3((major, minor): (u32, u32)) -> bool {
    (major, minor) >= (4, 3)
}

fn macos(runtime: Runtime, version: (u32, u32), arch: Arch) -> Option<&'static str> {
    use Runtime::{Mono, Standard};

    match (runtime, version, arch) {
        (Standard, (1, _), Arch::X86 | Arch::X64) => Some("osx32"),
        (Standard, (2, _), Arch::X86 | Arch::X64) => Some("osx.fat"),
        (Standard, (3, 0..=2), Arch::X64) => Some("osx.64"),
        (Mono, (3, 0..=2), Arch::X64) => Some("mono_osx.64"),
        (Standard, (3, _), Arch::X64) => Some("osx.universal"),
        (Mono, (3, _), Arch::X64) => Some("mono_osx.universal"),
        (Standard, (4.., _), Arch::X64) => Some("macos.universal"),
        (Mono, (4.., _), Arch::X64) => Some("mono_macos.universal"),
        (Standard, v, Arch::Arm64) if from_4_3(v) => Some("macos.universal"),
        (Mono, v, Arch::Arm64) if from_4_3(v) => Some("mono_macos.universal"),
        _ => None,
    }
}

fn linux(runtime: Runtime, version: (u32, u32), arch: Arch) -> Option<&'static str> {
    use Runtime::{Mono, Standard};

    match (runtime, version, arch) {
        (Standard, (1..=3, _), Arch::X64) => Some("x11.64"),
        (Standard, (1..=3, _), Arch::X86) => Some("x11.32"),
        (Mono, (3, _), Arch::X64) => Some("mono_x11_64"),
        (Mono, (3, _), Arch::X86) => Some("mono_x11_32"),
        (Standard, (4.., _), Arch::X64) => Some("linux.x86_64"),
        (Standard, (4.., _), Arch::X86) => Some("linux.x86_32"),
        (Standard, (4.., _), Arch::Arm64) => Some("linux.arm64"),
        (Standard, (4.., _), Arch::Arm32) => Some("linux.arm32"),
        (Mono, (4.., _), Arch::X64) => Some("mono_linux_x86_64"),
        (Mono, (4.., _), Arch::X86) => Some("mono_linux_x86_32"),
        (Mono, (4.., _), Arch::Arm64) => Some("mono_linux_arm64"),
        (Mono, (4.., _), Arch::Arm32) => Some("mono_linux_arm32"),
        _ => None,
    }
}

fn windows(runtime: Runtime, version: (u32, u32), arch: Arch) -> Option<&'static str> {
    use Runtime::{Mono, Standard};

    match (runtime, version, arch) {
        (Standard, _, Arch::X64) => Some("win64.exe"),
        (Standard, _, Arch::X86) => Some("win32.exe"),
        (Mono, (3.., _), Arch::X64) => Some("mono_win64"),
        (Mono, (3.., _), Arch::X86) => Some("mono_win32"),
        (Standard, v, Arch::Arm64) if from_4_3(v) => Some("windows_arm64.exe"),
        (Mono, v, Arch::Arm64) if from_4_3(v) => Some("mono_windows_arm64"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use gdvm_backend::{Arch, HostPlatform, Os, PlatformError, Release};

    use super::{resolve, resolve_release};

    fn name(token: &str, os: Os, arch: Arch) -> Result<String, PlatformError> {
        let release = Release::parse(token, os).expect("test release should parse");
        resolve(&release, HostPlatform::new(os, arch))
    }

    #[test]
    fn macos_names_follow_release_history() {
        let cases = [
            ("1.1-stable", "osx32"),
            ("2.1-stable", "osx.fat"),
            ("3.2-stable", "osx.64"),
            ("3.2-stable-mono", "mono_osx.64"),
            ("3.3-stable", "osx.universal"),
            ("3.5-stable-mono", "mono_osx.universal"),
            ("4.0-stable", "macos.universal"),
            ("4.2-stable-mono", "mono_macos.universal"),
        ];
        for (token, expected) in cases {
            assert_eq!(
                name(token, Os::MacOs, Arch::X64).as_deref(),
                Ok(expected),
                "{token}"
            );
        }
    }

    #[test]
    fn arm64_requires_4_3_on_macos_and_windows() {
        assert!(name("4.2-stable", Os::MacOs, Arch::Arm64).is_err());
        assert_eq!(
            name("4.3-stable", Os::MacOs, Arch::Arm64).as_deref(),
            Ok("macos.universal")
        );
        assert!(name("4.2-stable", Os::Windows, Arch::Arm64).is_err());
        assert_eq!(
            name("4.3-stable", Os::Windows, Arch::Arm64).as_deref(),
            Ok("windows_arm64.exe")
        );
        assert_eq!(
            name("5.0-stable-mono", Os::Windows, Arch::Arm64).as_deref(),
            Ok("mono_windows_arm64")
        );
    }

    #[test]
    fn linux_switches_from_x11_to_linux_names_at_4() {
        assert_eq!(
            name("3.5-stable", Os::Linux, Arch::X64).as_deref(),
            Ok("x11.64")
        );
        assert_eq!(
            name("3.5-stable-mono", Os::Linux, Arch::X86).as_deref(),
            Ok("mono_x11_32")
        );
        assert_eq!(
            name("4.2-stable", Os::Linux, Arch::X64).as_deref(),
            Ok("linux.x86_64")
        );
        assert_eq!(
            name("4.2-stable-mono", Os::Linux, Arch::Arm64).as_deref(),
            Ok("mono_linux_arm64")
        );
    }

    #[test]
    fn windows_names() {
        assert_eq!(
            name("2.0-stable", Os::Windows, Arch::X86).as_deref(),
            Ok("win32.exe")
        );
        assert_eq!(
            name("4.2-stable-mono", Os::Windows, Arch::X64).as_deref(),
            Ok("mono_win64")
        );
    }

    #[test]
    fn unpublished_combinations_are_unsupported() {
        let error = name("1.1-stable", Os::MacOs, Arch::Arm64).expect_err("1.x has no arm build");
        assert_eq!(
            error,
            PlatformError::Unsupported {
                release: "1.1-stable-standard".to_string(),
                os: Os::MacOs,
                arch: Arch::Arm64,
            }
        );

        assert!(name("2.1-stable-mono", Os::Linux, Arch::X64).is_err());
        assert!(name("2.1-stable-mono", Os::Windows, Arch::X64).is_err());
        assert!(name("4.2-stable", Os::Other, Arch::X64).is_err());
        assert!(name("3.5-stable", Os::Linux, Arch::Arm64).is_err());
    }

    #[test]
    fn resolve_release_attaches_platform() {
        let release = Release::parse("4.2-stable", Os::Linux).expect("release should parse");
        let resolved = resolve_release(release, HostPlatform::new(Os::Linux, Arch::X64))
            .expect("linux x64 is published");

        assert_eq!(resolved.platform(), Some("linux.x86_64"));
        assert_eq!(
            resolved.archive_file_name().as_deref(),
            Some("Godot_v4.2-stable_linux.x86_64.zip")
        );
    }
}
