use std::collections::BTreeMap;

use serde::Deserialize;

use pp_core::defaults::default_registry;
use pp_core::{GlobalState, PathHandler, Registry, Settings, SiteEntry};

/// Error type for settings documents.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Settings document is empty")]
    Empty,
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which document layout was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `extensionEnabled` + `siteSettings`
    Current,
    /// Older `redirectSettings` map holding only `enabled`/`preferredInstance`,
    /// layered over the built-in defaults
    Legacy,
    /// No site map at all; built-in defaults used
    Defaults,
}

#[derive(Debug, Clone)]
pub struct ParsedSettings {
    pub settings: Settings,
    pub format: DocumentFormat,
    /// Entries stored without an `instances` list.
    pub instances_filled: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    extension_enabled: Option<bool>,
    site_settings: Option<BTreeMap<String, RawSite>>,
    redirect_settings: Option<BTreeMap<String, RawSite>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSite {
    enabled: Option<bool>,
    instances: Option<Vec<String>>,
    custom_instances: Option<Vec<String>>,
    preferred_instance: Option<String>,
    path_handlers: Option<Vec<PathHandler>>,
}

/// Parse a stored settings document.
///
/// Tolerates missing fields the way older extension versions stored them;
/// invariant repair is left to [`crate::normalize_settings`].
pub fn parse_settings(text: &str) -> Result<ParsedSettings, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let raw: RawDocument = serde_json::from_str(text)?;
    let global = GlobalState {
        extension_enabled: raw.extension_enabled.unwrap_or(true),
    };

    if let Some(sites) = raw.site_settings {
        let builtin = default_registry();
        let mut registry = Registry::new();
        let mut instances_filled = 0usize;

        for (domain, site) in sites {
            let known = builtin.get(&domain);
            if site.instances.is_none() {
                instances_filled += 1;
            }
            registry.insert(&domain, site_from_raw(site, known));
        }

        return Ok(ParsedSettings {
            settings: Settings::new(global, registry),
            format: DocumentFormat::Current,
            instances_filled,
        });
    }

    if let Some(sites) = raw.redirect_settings {
        let mut registry = default_registry();
        for (domain, site) in sites {
            // Only sites we still ship are carried over.
            if !registry.contains(&domain) {
                log::debug!("Dropping unknown legacy site {}", domain);
                continue;
            }
            if let Some(enabled) = site.enabled {
                let _ = registry.set_enabled(&domain, enabled);
            }
            if let Some(preferred) = site.preferred_instance.as_deref() {
                if registry.set_preferred_instance(&domain, preferred).is_err() {
                    log::warn!("Legacy preferred instance {} for {} is no longer offered", preferred, domain);
                }
            }
        }

        return Ok(ParsedSettings {
            settings: Settings::new(global, registry),
            format: DocumentFormat::Legacy,
            instances_filled: 0,
        });
    }

    Ok(ParsedSettings {
        settings: Settings::new(global, default_registry()),
        format: DocumentFormat::Defaults,
        instances_filled: 0,
    })
}

fn site_from_raw(site: RawSite, known: Option<&SiteEntry>) -> SiteEntry {
    let preferred = site.preferred_instance.unwrap_or_default();

    let instances = match site.instances {
        Some(instances) => instances,
        None => {
            let mut filled: Vec<String> = known.map(|k| k.instances.clone()).unwrap_or_default();
            if !preferred.is_empty() && !filled.iter().any(|i| i.eq_ignore_ascii_case(&preferred)) {
                filled.push(preferred.clone());
            }
            filled
        }
    };

    SiteEntry {
        enabled: site.enabled.unwrap_or(true),
        instances,
        custom_instances: site.custom_instances.unwrap_or_default(),
        preferred_instance: preferred,
        path_handlers: site.path_handlers.unwrap_or_default(),
    }
}
