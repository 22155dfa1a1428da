//! Path transforms
//!
//! Per-site path handlers are plain data: a path prefix plus a
//! [`PathTransform`] interpreted by [`PathTransform::apply`]. The output is
//! either a path+query to append to the instance origin or an absolute URL.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::url::{nth_segment, segment_after};

/// Error raised by a transform that cannot produce a target for a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Missing query parameter: {0}")]
    MissingParam(String),
    #[error("Missing path segment after: {0}")]
    MissingSegment(String),
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    #[error("No template candidate could be resolved")]
    Unresolved,
    #[error("Transform produced an empty target")]
    Empty,
}

// =============================================================================
// Transform Kinds
// =============================================================================

/// What to do when a `query_param` transform finds no value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Forward path and query unchanged
    #[default]
    Passthrough,
    /// Send the user to the instance front page
    Root,
    /// Fail, so the resolver uses its default rule
    Fail,
}

/// Data-described rewrite of a request path/query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathTransform {
    /// Path and query string, unchanged.
    Passthrough,
    /// Path only; the query string is dropped.
    PathOnly,
    /// Keep a single query parameter. `target` contains `{}` where the
    /// percent-encoded value goes, e.g. `/watch?v={}`.
    QueryParam {
        param: String,
        target: String,
        #[serde(default)]
        fallback: Fallback,
    },
    /// Keep the path segment that follows `marker`, e.g. marker `/channel/`
    /// with target `/channel/{}`.
    PathSegment { marker: String, target: String },
    /// Ordered templates; the first whose placeholders all resolve wins.
    ///
    /// Placeholders: `{name}` query parameter (percent-encoded),
    /// `{name|default}` with a literal default, `{@N}` the N-th path segment.
    Template { candidates: Vec<String> },
}

impl PathTransform {
    pub fn query_param(param: &str, target: &str, fallback: Fallback) -> Self {
        Self::QueryParam {
            param: param.to_string(),
            target: target.to_string(),
            fallback,
        }
    }

    pub fn path_segment(marker: &str, target: &str) -> Self {
        Self::PathSegment {
            marker: marker.to_string(),
            target: target.to_string(),
        }
    }

    pub fn template(candidates: &[&str]) -> Self {
        Self::Template {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Evaluate this transform against a parsed request URL.
    pub fn apply(&self, url: &Url) -> Result<String, TransformError> {
        let out = match self {
            PathTransform::Passthrough => path_and_query(url),
            PathTransform::PathOnly => url.path().to_string(),
            PathTransform::QueryParam {
                param,
                target,
                fallback,
            } => match query_value(url, param) {
                Some(value) => target.replacen("{}", &urlencoding::encode(&value), 1),
                None => match fallback {
                    Fallback::Passthrough => path_and_query(url),
                    Fallback::Root => "/".to_string(),
                    Fallback::Fail => return Err(TransformError::MissingParam(param.clone())),
                },
            },
            PathTransform::PathSegment { marker, target } => {
                let segment = segment_after(url.path(), marker)
                    .ok_or_else(|| TransformError::MissingSegment(marker.clone()))?;
                target.replacen("{}", segment, 1)
            }
            PathTransform::Template { candidates } => {
                let mut resolved = None;
                for candidate in candidates {
                    match render_template(candidate, url) {
                        Ok(out) => {
                            resolved = Some(out);
                            break;
                        }
                        Err(TransformError::InvalidTemplate(t)) => {
                            return Err(TransformError::InvalidTemplate(t));
                        }
                        Err(_) => continue,
                    }
                }
                resolved.ok_or(TransformError::Unresolved)?
            }
        };

        if out.is_empty() {
            return Err(TransformError::Empty);
        }
        Ok(out)
    }
}

// =============================================================================
// Path Handlers
// =============================================================================

/// A transform bound to a path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathHandler {
    pub prefix: String,
    pub transform: PathTransform,
}

impl PathHandler {
    pub fn new(prefix: &str, transform: PathTransform) -> Self {
        Self {
            prefix: prefix.to_string(),
            transform,
        }
    }

    /// Containment, not anchoring: `/c/` matches `/c/name` and `/x/c/name`.
    #[inline]
    pub fn matches(&self, path: &str) -> bool {
        path.contains(self.prefix.as_str())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(q) if !q.is_empty() => format!("{}?{}", url.path(), q),
        _ => url.path().to_string(),
    }
}

/// First non-empty value of a query parameter, decoded.
fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn render_template(template: &str, url: &Url) -> Result<String, TransformError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| TransformError::InvalidTemplate(template.to_string()))?;
        let placeholder = &after[..close];

        if let Some(index) = placeholder.strip_prefix('@') {
            let index: usize = index
                .parse()
                .map_err(|_| TransformError::InvalidTemplate(template.to_string()))?;
            let segment = nth_segment(url.path(), index)
                .ok_or_else(|| TransformError::MissingSegment(format!("@{}", index)))?;
            out.push_str(segment);
        } else {
            let (name, default) = match placeholder.split_once('|') {
                Some((name, default)) => (name, Some(default)),
                None => (placeholder, None),
            };
            if name.is_empty() {
                return Err(TransformError::InvalidTemplate(template.to_string()));
            }
            match (query_value(url, name), default) {
                (Some(value), _) => out.push_str(&urlencoding::encode(&value)),
                (None, Some(default)) => out.push_str(default),
                (None, None) => return Err(TransformError::MissingParam(name.to_string())),
            }
        }

        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}
