//! Redirect Resolver
//!
//! Every navigation goes through here. Resolution reads a settings snapshot
//! and never writes; any failure ends in `NoRedirect` or in the default
//! rewrite rule, never in an error for the caller.

use std::borrow::Cow;

use url::Url;

use crate::registry::{Settings, SiteEntry};
use crate::types::{Decision, Reason, Resolution};
use crate::url::{host_matches, host_of, is_absolute, is_valid_instance, is_web_scheme, trim_origin};

// =============================================================================
// Resolver
// =============================================================================

/// Redirect decision engine over one settings snapshot.
pub struct Resolver<'a> {
    settings: &'a Settings,
    /// Registry keys, most specific first.
    order: Cow<'a, [String]>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for the given snapshot.
    pub fn new(settings: &'a Settings) -> Self {
        let order = settings
            .registry
            .match_order()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        Self {
            settings,
            order: Cow::Owned(order),
        }
    }

    /// Create a resolver reusing a match order already computed for this
    /// snapshot with [`Registry::match_order`](crate::Registry::match_order).
    pub fn with_order(settings: &'a Settings, order: &'a [String]) -> Self {
        Self {
            settings,
            order: Cow::Borrowed(order),
        }
    }

    /// Find the registry entry a host belongs to.
    pub fn find_site(&self, host: &str) -> Option<(&'a str, &'a SiteEntry)> {
        let settings: &'a Settings = self.settings;
        self.order
            .iter()
            .find(|domain| host_matches(host, domain))
            .and_then(|domain| settings.registry.get_key_value(domain))
    }

    /// Resolve a request URL to a redirect decision.
    pub fn resolve(&self, request_url: &str) -> Resolution {
        if !self.settings.extension_enabled() {
            return Resolution::skip(Reason::GlobalDisabled);
        }

        let url = match Url::parse(request_url) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Not redirecting unparseable URL {:?}: {}", request_url, e);
                return Resolution::skip(Reason::MalformedUrl);
            }
        };

        if !is_web_scheme(url.scheme()) {
            return Resolution::skip(Reason::UnsupportedScheme);
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Resolution::skip(Reason::MalformedUrl),
        };

        let (domain, entry) = match self.find_site(host) {
            Some(found) => found,
            None => return Resolution::skip(Reason::NoMatchingSite),
        };

        let mut result = Resolution::skip(Reason::SiteDisabled);
        result.site = Some(domain.to_string());

        if !entry.enabled {
            return result;
        }

        let origin = match entry.effective_instance() {
            Some(instance) if is_valid_instance(instance) => trim_origin(instance),
            _ => {
                log::warn!("Site {} has no usable instance", domain);
                result.reason = Reason::NoInstance;
                return result;
            }
        };

        let (target, reason, handler) = rewrite(domain, entry, &url, origin);
        result.handler = handler;

        let target_host = match host_of(&target) {
            Some(target_host) => target_host,
            None => {
                log::warn!("Not redirecting {} to malformed target {:?}", request_url, target);
                result.reason = Reason::MalformedUrl;
                return result;
            }
        };
        if target_host.eq_ignore_ascii_case(host) {
            result.reason = Reason::SelfRedirect;
            return result;
        }

        log::debug!("{} -> {} ({})", request_url, target, reason.as_str());
        result.decision = Decision::Redirect;
        result.redirect_url = Some(target);
        result.reason = reason;
        result
    }

    /// Convenience: just the target URL, if any.
    pub fn redirect_url(&self, request_url: &str) -> Option<String> {
        self.resolve(request_url).redirect_url
    }
}

/// Resolve one URL against a snapshot.
pub fn resolve(settings: &Settings, request_url: &str) -> Resolution {
    Resolver::new(settings).resolve(request_url)
}

// =============================================================================
// Rewrite
// =============================================================================

/// Apply the first matching path handler, or the default rule.
fn rewrite(
    domain: &str,
    entry: &SiteEntry,
    url: &Url,
    origin: &str,
) -> (String, Reason, Option<String>) {
    let path = url.path();

    if let Some(handler) = entry.path_handlers.iter().find(|h| h.matches(path)) {
        return match handler.transform.apply(url) {
            Ok(out) if is_absolute(&out) => (out, Reason::PathHandler, Some(handler.prefix.clone())),
            Ok(out) if out.starts_with('/') => (
                format!("{}{}", origin, out),
                Reason::PathHandler,
                Some(handler.prefix.clone()),
            ),
            Ok(out) => (
                format!("{}/{}", origin, out),
                Reason::PathHandler,
                Some(handler.prefix.clone()),
            ),
            Err(e) => {
                log::warn!("Path handler {}{} failed: {}", domain, handler.prefix, e);
                (
                    default_target(url, origin),
                    Reason::HandlerFallback,
                    Some(handler.prefix.clone()),
                )
            }
        };
    }

    (default_target(url, origin), Reason::DefaultRule, None)
}

/// Instance origin + original path + original query.
fn default_target(url: &Url, origin: &str) -> String {
    match url.query() {
        Some(q) if !q.is_empty() => format!("{}{}?{}", origin, url.path(), q),
        _ => format!("{}{}", origin, url.path()),
    }
}
