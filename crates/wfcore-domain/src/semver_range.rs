//! `VersionConstraints` matching: a comma-separated conjunction of `=, !=, >, >=, <, <=, ~, ^`
//! comparators applied to a SemVer 2.0.0 version (§6). `semver::VersionReq` already parses
//! everything but `!=`, so that operator is split out and checked separately; the rest is
//! handed to `VersionReq` as-is.

use semver::{Version, VersionReq};

use crate::error::{Error, Result};

/// `Extension.Version` is allowed to be a partial version (`"1.0"`, `"2"`); pad it to a
/// full `major.minor.patch` before handing it to `semver::Version::parse`.
fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    let (core_and_pre, build) = match raw.split_once('+') {
        Some((a, b)) => (a, Some(b)),
        None => (raw, None),
    };
    let (core, pre) = match core_and_pre.split_once('-') {
        Some((a, b)) => (a, Some(b)),
        None => (core_and_pre, None),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    let mut out = parts.join(".");
    if let Some(p) = pre {
        out.push('-');
        out.push_str(p);
    }
    if let Some(b) = build {
        out.push('+');
        out.push_str(b);
    }
    out
}

pub fn parse_version(raw: &str) -> Result<Version> {
    let normalized = normalize(raw);
    Version::parse(&normalized)
        .map_err(|e| Error::InvalidArgument(format!("invalid version '{raw}': {e}")))
}

pub fn is_valid_version(raw: &str) -> bool {
    parse_version(raw).is_ok()
}

/// Empty `constraints` matches any version.
pub fn matches(version: &str, constraints: &str) -> Result<bool> {
    let constraints = constraints.trim();
    if constraints.is_empty() {
        return Ok(true);
    }
    let v = parse_version(version)?;
    let mut req_clauses = Vec::new();
    for raw_clause in constraints.split(',') {
        let clause = raw_clause.trim();
        if clause.is_empty() {
            continue;
        }
        if let Some(rest) = clause.strip_prefix("!=") {
            let excluded = parse_version(rest.trim())?;
            if v == excluded {
                return Ok(false);
            }
        } else {
            req_clauses.push(clause);
        }
    }
    if req_clauses.is_empty() {
        return Ok(true);
    }
    let joined = req_clauses.join(",");
    let req = VersionReq::parse(&joined)
        .map_err(|e| Error::InvalidArgument(format!("invalid version constraints '{constraints}': {e}")))?;
    Ok(req.matches(&v))
}
