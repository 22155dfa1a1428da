//! URL helpers shared by the registry and the resolver.
//!
//! Request URLs go through the `url` crate once; everything here works on the
//! already-split pieces or on instance origin strings.

use url::Url;

// =============================================================================
// Scheme
// =============================================================================

/// Only web navigations are eligible for redirection.
#[inline]
pub fn is_web_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http")
}

// =============================================================================
// Host Matching
// =============================================================================

/// Check whether `host` belongs to the registry key `domain`.
///
/// Matches the bare domain and its `www.` form only; other subdomains are
/// separate registry keys.
#[inline]
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.');
    if host.eq_ignore_ascii_case(domain) {
        return true;
    }
    match host.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("www.") => host[4..].eq_ignore_ascii_case(domain),
        _ => false,
    }
}

// =============================================================================
// Instance Origins
// =============================================================================

/// Strip trailing slashes so the origin can be joined with a path.
#[inline]
pub fn trim_origin(instance: &str) -> &str {
    instance.trim_end_matches('/')
}

/// Normalize a user-supplied instance to its origin form.
///
/// Returns `None` unless the URL is absolute, `https`, has a host and
/// carries nothing beyond the origin (no credentials, path, query or fragment).
pub fn normalize_instance(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    if parsed.scheme() != "https" {
        return None;
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return None,
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return None;
    }
    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return None;
    }
    Some(parsed.origin().ascii_serialization())
}

/// Whether a stored instance can serve as a redirect origin: `https`, with a
/// host and without credentials. Unlike [`normalize_instance`] the stored
/// spelling is left alone.
pub fn is_valid_instance(instance: &str) -> bool {
    match Url::parse(instance.trim()) {
        Ok(parsed) => {
            parsed.scheme() == "https"
                && parsed.host_str().is_some_and(|h| !h.is_empty())
                && parsed.username().is_empty()
                && parsed.password().is_none()
        }
        Err(_) => false,
    }
}

/// Host of an http(s) target URL, lowercased. `None` for any other scheme
/// or a URL without a host.
pub fn host_of(absolute: &str) -> Option<String> {
    let parsed = Url::parse(absolute).ok()?;
    if !is_web_scheme(parsed.scheme()) {
        return None;
    }
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_ascii_lowercase())
}

/// Whether a transform produced an absolute URL rather than a path.
#[inline]
pub fn is_absolute(target: &str) -> bool {
    let bytes = target.as_bytes();
    (bytes.len() >= 8 && bytes[..8].eq_ignore_ascii_case(b"https://"))
        || (bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"http://"))
}

// =============================================================================
// Path Segments
// =============================================================================

/// The path segment directly following `marker`.
///
/// `segment_after("/channel/UC123/videos", "/channel/")` is `Some("UC123")`.
/// Empty segments count as missing.
pub fn segment_after<'a>(path: &'a str, marker: &str) -> Option<&'a str> {
    let start = path.find(marker)? + marker.len();
    let rest = &path[start..];
    let segment = rest.split('/').next().unwrap_or("");
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

/// The `index`-th non-empty path segment, 0-based.
pub fn nth_segment(path: &str, index: usize) -> Option<&str> {
    path.split('/').filter(|s| !s.is_empty()).nth(index)
}
