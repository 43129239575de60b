//! Version ordering shared by every resolver.
//!
//! A version is split at the first `-` or `+` into a dotted numeric prefix and
//! an optional qualifier. Numeric components compare by value with missing
//! trailing components read as zero. On a numeric tie a release beats any
//! qualified build of the same numbers; two qualified (or two unqualified)
//! versions then fall back to plain string order. A prefix that is not purely
//! numeric makes the whole comparison a string comparison.

use std::cmp::Ordering;

/// Qualifiers that mark a build as not being a final release.
const PRERELEASE_MARKERS: &[&str] = &[
    "alpha", "beta", "rc", "cr", "m", "milestone", "snapshot", "preview", "dev", "ea", "eap",
];

fn split(version: &str) -> (&str, Option<&str>) {
    match version.find(['-', '+']) {
        Some(pos) => (&version[..pos], Some(&version[pos + 1..])),
        None => (version, None),
    }
}

fn numeric_parts(prefix: &str) -> Option<Vec<u64>> {
    prefix
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Total order over version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_prefix, a_qualifier) = split(a);
    let (b_prefix, b_qualifier) = split(b);

    let (Some(a_nums), Some(b_nums)) = (numeric_parts(a_prefix), numeric_parts(b_prefix)) else {
        return a.cmp(b);
    };

    let len = a_nums.len().max(b_nums.len());
    for i in 0..len {
        let x = a_nums.get(i).copied().unwrap_or(0);
        let y = b_nums.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    match (a_qualifier, b_qualifier) {
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        _ => a.cmp(b),
    }
}

/// `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

/// Whether a Maven version names a milestone, candidate or snapshot.
///
/// Maven also spells qualifiers with a dot (`5.0.0.RC1`) or glued to the last
/// number (`2.0M1`), so any alphabetic segment is inspected, not just the part
/// after `-`.
pub fn is_prerelease(version: &str) -> bool {
    let lower = version.to_lowercase();
    lower
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .any(|word| PRERELEASE_MARKERS.contains(&word))
}

/// Highest of `versions`, skipping prereleases unless none of them is stable.
pub fn highest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let (stable, pre): (Vec<&str>, Vec<&str>) =
        versions.into_iter().partition(|v| !is_prerelease(v));
    let pool = if stable.is_empty() { pre } else { stable };
    pool.into_iter().max_by(|a, b| compare_versions(a, b))
}
