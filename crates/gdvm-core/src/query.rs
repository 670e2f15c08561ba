//! Matching of user queries and project requirements against release
//! catalogs.
//!
//! Catalogs here are plain release-name strings in the order the caller
//! holds them (newest first for the cached remote catalog).

use std::cmp::Ordering;

use gdvm_backend::{Os, Release, ReleaseType, Runtime, VersionResolutionError, stability_prefix};

const RUNTIME_TOKENS: [&str; 2] = ["mono", "standard"];
const LATEST: &str = "latest";

/// Order applied by [`filter_by_query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Major, minor, stability, then patch, all descending.
    Chronological,
    /// The full release ordering, descending.
    #[default]
    StabilityFirst,
}

fn is_runtime_token(token: &str) -> bool {
    RUNTIME_TOKENS.iter().any(|rt| token.eq_ignore_ascii_case(rt))
}

pub(crate) fn is_latest_token(token: &str) -> bool {
    token.eq_ignore_ascii_case(LATEST)
}

fn looks_like_version(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

fn is_known_token(token: &str) -> bool {
    is_runtime_token(token)
        || is_latest_token(token)
        || stability_prefix(token).is_some()
        || looks_like_version(token)
}

/// Returns every token that is neither a runtime, `latest`, a stability
/// keyword, nor version-shaped.
#[must_use]
pub fn validate_tokens(query: &[String]) -> Vec<String> {
    query
        .iter()
        .filter(|token| !is_known_token(token))
        .cloned()
        .collect()
}

/// A single `-`-joined token such as `4.2-stable-mono` is treated as the
/// equivalent multi-token query.
pub(crate) fn normalize(query: &[String]) -> Vec<String> {
    match query {
        [single] if single.contains('-') => single
            .split('-')
            .filter(|part| !part.is_empty())
            .map(str::to_ascii_lowercase)
            .collect(),
        _ => query.iter().map(|token| token.to_ascii_lowercase()).collect(),
    }
}

fn runtime_of(tokens: &[String]) -> Runtime {
    if tokens.iter().any(|token| token == "mono") {
        Runtime::Mono
    } else {
        Runtime::Standard
    }
}

/// The runtime a normalized query names explicitly, if any.
pub(crate) fn explicit_runtime(tokens: &[String]) -> Option<Runtime> {
    tokens
        .iter()
        .find(|token| is_runtime_token(token))
        .map(|token| runtime_from_token(token))
}

fn runtime_from_token(token: &str) -> Runtime {
    if token == "mono" {
        Runtime::Mono
    } else {
        Runtime::Standard
    }
}

/// First name containing `keyword`, in catalog order.
fn latest_of_type(catalog: &[String], keyword: &str, runtime: Runtime, host_os: Os) -> Option<Release> {
    catalog
        .iter()
        .find(|name| name.contains(keyword))
        .and_then(|name| Release::parse(name, host_os))
        .map(|release| release.with_runtime(runtime))
}

/// Resolve a query to the single best release in `catalog`.
///
/// Recognized shapes are `latest`, `latest <runtime>`, `latest <type>` and
/// `latest <type> <runtime>`; anything else is an explicit filter over a
/// version prefix, an optional stability keyword and an optional runtime.
///
/// # Errors
/// Returns [`VersionResolutionError::InvalidVersion`] for an empty query or
/// when any token is unrecognized.
pub fn find_by_query(
    query: &[String],
    catalog: &[String],
    host_os: Os,
) -> Result<Option<Release>, VersionResolutionError> {
    let tokens = normalize(query);
    if tokens.is_empty() {
        return Err(VersionResolutionError::InvalidVersion { tokens: Vec::new() });
    }

    let invalid = validate_tokens(&tokens);
    if !invalid.is_empty() {
        return Err(VersionResolutionError::InvalidVersion { tokens: invalid });
    }

    let stable = ReleaseType::Stable.keyword();
    let latest = match tokens.as_slice() {
        [first] if is_latest_token(first) => {
            Some(latest_of_type(catalog, stable, Runtime::Standard, host_os))
        }
        [first, second] if is_latest_token(first) && is_runtime_token(second) => Some(
            latest_of_type(catalog, stable, runtime_from_token(second), host_os),
        ),
        [first, second] if is_latest_token(first) && stability_prefix(second).is_some() => {
            Some(latest_of_type(catalog, second, Runtime::Standard, host_os))
        }
        [first, second, third]
            if is_latest_token(first)
                && stability_prefix(second).is_some()
                && is_runtime_token(third) =>
        {
            Some(latest_of_type(
                catalog,
                second,
                runtime_from_token(third),
                host_os,
            ))
        }
        _ => None,
    };
    if let Some(found) = latest {
        return Ok(found);
    }

    Ok(explicit_match(&tokens, catalog, host_os))
}

fn explicit_match(tokens: &[String], catalog: &[String], host_os: Os) -> Option<Release> {
    let runtime = runtime_of(tokens);
    let mut stability = tokens
        .iter()
        .find(|token| stability_prefix(token).is_some())
        .map(String::as_str);
    let prefix = tokens
        .iter()
        .find(|token| looks_like_version(token))
        .map_or("", String::as_str);

    if prefix.len() == 1 && stability.is_none() {
        stability = Some(ReleaseType::Stable.keyword());
    }

    catalog
        .iter()
        .filter(|name| name.starts_with(prefix))
        .filter(|name| stability.is_none_or(|keyword| name.contains(keyword)))
        .filter_map(|name| Release::parse(name, host_os))
        .map(|release| release.with_runtime(runtime))
        .max()
}

fn chronological(a: &Release, b: &Release) -> Ordering {
    b.major()
        .cmp(&a.major())
        .then_with(|| b.minor().cmp(&a.minor()))
        .then_with(|| b.release_type().cmp(&a.release_type()))
        .then_with(|| b.patch().cmp(&a.patch()))
}

/// Every catalog name matching the query's version prefix and stability
/// keyword, in `order`. Other tokens are ignored.
#[must_use]
pub fn filter_by_query(
    query: &[String],
    catalog: &[String],
    order: SortOrder,
    host_os: Os,
) -> Vec<String> {
    let tokens = normalize(query);
    let stability = tokens.iter().find(|token| stability_prefix(token).is_some());
    let prefix = tokens
        .iter()
        .find(|token| looks_like_version(token))
        .map_or("", String::as_str);

    let mut matches: Vec<(&String, Release)> = catalog
        .iter()
        .filter(|name| name.starts_with(prefix))
        .filter(|name| stability.is_none_or(|keyword| name.contains(keyword.as_str())))
        .filter_map(|name| {
            Release::parse(name, host_os)
                .map(|release| (name, release.with_runtime(Runtime::Standard)))
        })
        .collect();

    match order {
        SortOrder::Chronological => matches.sort_by(|(_, a), (_, b)| chronological(a, b)),
        SortOrder::StabilityFirst => matches.sort_by(|(_, a), (_, b)| b.cmp(a)),
    }

    matches.into_iter().map(|(name, _)| name.clone()).collect()
}

fn project_requirement(project_version: &str) -> Option<(u32, Option<u32>)> {
    let mut parts = project_version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => Some(minor.parse().ok()?),
        None => None,
    };
    Some((major, minor))
}

/// Pick the best installed release for a project.
///
/// An installed name equal to `project_version` wins outright. Otherwise the
/// installed releases of the wanted runtime whose major (and minor, when the
/// project names one) match are compared and the greatest is returned.
#[must_use]
pub fn find_compatible(
    project_version: &str,
    wants_mono: bool,
    installed: &[String],
    host_os: Os,
) -> Option<String> {
    if let Some(exact) = installed.iter().find(|name| *name == project_version) {
        return Some(exact.clone());
    }

    let (major, minor) = project_requirement(project_version)?;
    let runtime = if wants_mono {
        Runtime::Mono
    } else {
        Runtime::Standard
    };

    installed
        .iter()
        .filter_map(|name| Release::parse(name, host_os).map(|release| (name, release)))
        .filter(|(_, release)| release.runtime() == runtime)
        .filter(|(_, release)| release.major() == major)
        .filter(|(_, release)| minor.is_none_or(|minor| release.minor() == minor))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(name, _)| name.clone())
}

/// Sort release names newest first by the release ordering. Names that do
/// not parse keep their relative order at the end.
#[must_use]
pub fn sort_newest_first(names: Vec<String>, host_os: Os) -> Vec<String> {
    let (mut parsed, unparsed): (Vec<_>, Vec<_>) = names
        .into_iter()
        .map(|name| (Release::parse(&name, host_os), name))
        .partition(|(release, _)| release.is_some());

    parsed.sort_by(|(a, _), (b, _)| b.cmp(a));

    parsed
        .into_iter()
        .chain(unparsed)
        .map(|(_, name)| name)
        .collect()
}
