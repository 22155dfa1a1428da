//! Site Registry
//!
//! Per-domain redirect configuration plus the only write path into it. Every
//! mutation validates before it touches anything, so a rejected call leaves
//! the entry exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::defaults::default_registry;
use crate::transform::PathHandler;
use crate::types::{GlobalState, Repairs};
use crate::url::{is_valid_instance, normalize_instance, trim_origin};

/// Error type for registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid instance URL (expected an https origin): {0}")]
    InvalidUrl(String),
    #[error("Instance is not configured for this site: {0}")]
    InvalidInstance(String),
    #[error("Instance already present: {0}")]
    Duplicate(String),
}

impl RegistryError {
    /// Stable code for UI surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotFound(_) => "not_found",
            RegistryError::InvalidUrl(_) => "invalid_url",
            RegistryError::InvalidInstance(_) => "invalid_instance",
            RegistryError::Duplicate(_) => "duplicate",
        }
    }
}

// =============================================================================
// Site Entry
// =============================================================================

/// Redirect configuration for one source domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Built-in instances; order is fallback priority.
    #[serde(default)]
    pub instances: Vec<String>,
    /// User-added https origins.
    #[serde(default)]
    pub custom_instances: Vec<String>,
    #[serde(default)]
    pub preferred_instance: String,
    /// Checked in order; first containing match wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_handlers: Vec<PathHandler>,
}

fn default_true() -> bool {
    true
}

fn same_instance(a: &str, b: &str) -> bool {
    trim_origin(a).eq_ignore_ascii_case(trim_origin(b))
}

impl SiteEntry {
    /// Create an enabled entry preferring the first instance.
    pub fn new(instances: &[&str]) -> Self {
        Self {
            enabled: true,
            instances: instances.iter().map(|s| s.to_string()).collect(),
            custom_instances: Vec::new(),
            preferred_instance: instances.first().map(|s| s.to_string()).unwrap_or_default(),
            path_handlers: Vec::new(),
        }
    }

    /// Sets the path handlers.
    pub fn with_handlers(mut self, handlers: Vec<PathHandler>) -> Self {
        self.path_handlers = handlers;
        self
    }

    /// Built-in instances followed by custom ones.
    pub fn all_instances(&self) -> impl Iterator<Item = &str> {
        self.instances
            .iter()
            .chain(self.custom_instances.iter())
            .map(|s| s.as_str())
    }

    /// The stored spelling of `url` if it is one of this entry's instances.
    pub fn find_instance(&self, url: &str) -> Option<&str> {
        self.all_instances().find(|i| same_instance(i, url))
    }

    pub fn contains_instance(&self, url: &str) -> bool {
        self.find_instance(url).is_some()
    }

    /// `instances[0]`, or the first custom instance when there are no built-ins.
    pub fn default_instance(&self) -> Option<&str> {
        self.instances
            .first()
            .or_else(|| self.custom_instances.first())
            .map(|s| s.as_str())
    }

    /// The instance to redirect to: the preferred one if it is still a
    /// member, the default otherwise.
    pub fn effective_instance(&self) -> Option<&str> {
        self.find_instance(&self.preferred_instance)
            .or_else(|| self.default_instance())
    }

    /// Re-establish the entry invariants on data that came from outside.
    pub fn repair(&mut self) -> Repairs {
        let mut repairs = Repairs::empty();

        let mut custom = Vec::with_capacity(self.custom_instances.len());
        for raw in self.custom_instances.drain(..) {
            match normalize_instance(&raw) {
                Some(normalized) => {
                    if normalized != raw {
                        repairs |= Repairs::CUSTOM_NORMALIZED;
                    }
                    custom.push(normalized);
                }
                None => repairs |= Repairs::INVALID_CUSTOM_DROPPED,
            }
        }

        let listed = self.instances.len();
        self.instances.retain(|i| is_valid_instance(i));
        if self.instances.len() != listed {
            repairs |= Repairs::INVALID_INSTANCE_DROPPED;
        }

        let mut seen: Vec<String> = Vec::new();
        let mut dedupe = |list: Vec<String>, repairs: &mut Repairs| -> Vec<String> {
            let mut kept = Vec::with_capacity(list.len());
            for item in list {
                let key = trim_origin(&item).to_ascii_lowercase();
                if seen.contains(&key) {
                    *repairs |= Repairs::DUPLICATES_REMOVED;
                } else {
                    seen.push(key);
                    kept.push(item);
                }
            }
            kept
        };
        let instances = std::mem::take(&mut self.instances);
        self.instances = dedupe(instances, &mut repairs);
        self.custom_instances = dedupe(custom, &mut repairs);

        match self.find_instance(&self.preferred_instance).map(str::to_string) {
            Some(stored) => self.preferred_instance = stored,
            None => {
                let fallback = self.default_instance().unwrap_or("").to_string();
                if fallback != self.preferred_instance {
                    repairs |= Repairs::PREFERRED_RESET;
                }
                self.preferred_instance = fallback;
            }
        }

        repairs
    }
}

// =============================================================================
// Registry
// =============================================================================

/// All per-domain redirect configurations, keyed by bare domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    sites: BTreeMap<String, SiteEntry>,
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in default set.
    pub fn defaults() -> Self {
        default_registry()
    }

    pub fn insert(&mut self, domain: &str, entry: SiteEntry) -> Option<SiteEntry> {
        self.sites.insert(normalize_domain(domain), entry)
    }

    pub fn get(&self, domain: &str) -> Option<&SiteEntry> {
        self.sites.get(&normalize_domain(domain))
    }

    /// Like [`Registry::get`], also returning the stored key.
    pub fn get_key_value(&self, domain: &str) -> Option<(&str, &SiteEntry)> {
        self.sites
            .get_key_value(&normalize_domain(domain))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.get(domain).is_some()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SiteEntry)> {
        self.sites.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut SiteEntry)> {
        self.sites.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(|k| k.as_str())
    }

    /// Domain keys in host-matching order: longer (more specific) keys
    /// first, so `music.youtube.com` is tried before `youtube.com`.
    pub fn match_order(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.domains().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        keys
    }

    fn entry_mut(&mut self, domain: &str) -> Result<&mut SiteEntry, RegistryError> {
        self.sites
            .get_mut(&normalize_domain(domain))
            .ok_or_else(|| RegistryError::NotFound(domain.to_string()))
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub fn set_enabled(&mut self, domain: &str, enabled: bool) -> Result<(), RegistryError> {
        self.entry_mut(domain)?.enabled = enabled;
        Ok(())
    }

    /// Select the instance used for `domain`. Non-members are rejected and
    /// the current preference is kept.
    pub fn set_preferred_instance(&mut self, domain: &str, url: &str) -> Result<(), RegistryError> {
        let entry = self.entry_mut(domain)?;
        let stored = entry
            .find_instance(url)
            .map(str::to_string)
            .ok_or_else(|| RegistryError::InvalidInstance(url.to_string()))?;
        entry.preferred_instance = stored;
        Ok(())
    }

    /// Point `domain` back at its default instance.
    pub fn reset_to_default_instance(&mut self, domain: &str) -> Result<(), RegistryError> {
        let entry = self.entry_mut(domain)?;
        entry.preferred_instance = entry.default_instance().unwrap_or("").to_string();
        Ok(())
    }

    /// Add a user instance. The URL is stored in its origin form.
    pub fn add_custom_instance(&mut self, domain: &str, url: &str) -> Result<(), RegistryError> {
        let entry = self.entry_mut(domain)?;
        let normalized =
            normalize_instance(url).ok_or_else(|| RegistryError::InvalidUrl(url.to_string()))?;
        if entry.contains_instance(&normalized) {
            return Err(RegistryError::Duplicate(normalized));
        }
        entry.custom_instances.push(normalized);
        Ok(())
    }

    /// Remove a user instance. Removing the preferred instance resets the
    /// preference to the default instance.
    pub fn remove_custom_instance(&mut self, domain: &str, url: &str) -> Result<(), RegistryError> {
        let entry = self.entry_mut(domain)?;
        let wanted = normalize_instance(url).unwrap_or_else(|| trim_origin(url.trim()).to_string());
        let index = entry
            .custom_instances
            .iter()
            .position(|i| same_instance(i, &wanted))
            .ok_or_else(|| RegistryError::NotFound(url.to_string()))?;

        let removed = entry.custom_instances.remove(index);
        if same_instance(&entry.preferred_instance, &removed) {
            entry.preferred_instance = entry.default_instance().unwrap_or("").to_string();
        }
        Ok(())
    }

    /// Replace everything with the built-in default set.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::defaults();
    }

    /// Repair every entry; returns the union of repairs performed.
    pub fn repair(&mut self) -> Repairs {
        let mut all = Repairs::empty();
        for (domain, entry) in self.sites.iter_mut() {
            let repairs = entry.repair();
            if !repairs.is_empty() {
                log::warn!("Repaired settings for {}: {:?}", domain, repairs);
            }
            all |= repairs;
        }
        all
    }
}

// =============================================================================
// Settings Document
// =============================================================================

/// Global state plus registry: the unit that is persisted and snapshotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(flatten)]
    pub global: GlobalState,
    #[serde(rename = "siteSettings", default)]
    pub registry: Registry,
}

impl Settings {
    pub fn new(global: GlobalState, registry: Registry) -> Self {
        Self { global, registry }
    }

    /// Extension enabled, built-in default registry.
    pub fn defaults() -> Self {
        Self::new(GlobalState::default(), Registry::defaults())
    }

    pub fn extension_enabled(&self) -> bool {
        self.global.extension_enabled
    }

    pub fn set_global_enabled(&mut self, enabled: bool) {
        self.global.extension_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registry {
        let mut r = Registry::new();
        r.insert("youtube.com", SiteEntry::new(&["https://yewtu.be", "https://inv.nadeko.net"]));
        r.insert("music.youtube.com", SiteEntry::new(&["https://beatbump.io"]));
        r
    }

    #[test]
    fn test_get_and_keys_are_case_insensitive() {
        let r = sample();
        assert!(r.get("YouTube.com").is_some());
        assert!(r.get("vimeo.com").is_none());
    }

    #[test]
    fn test_match_order_prefers_longer_keys() {
        let r = sample();
        assert_eq!(r.match_order(), vec!["music.youtube.com", "youtube.com"]);
    }

    #[test]
    fn test_set_enabled() {
        let mut r = sample();
        r.set_enabled("youtube.com", false).unwrap();
        assert!(!r.get("youtube.com").unwrap().enabled);
        assert_eq!(
            r.set_enabled("vimeo.com", false),
            Err(RegistryError::NotFound("vimeo.com".to_string()))
        );
    }

    #[test]
    fn test_set_preferred_instance_rejects_non_member() {
        let mut r = sample();
        r.set_preferred_instance("youtube.com", "https://inv.nadeko.net").unwrap();
        assert_eq!(r.get("youtube.com").unwrap().preferred_instance, "https://inv.nadeko.net");

        let before = r.clone();
        assert_eq!(
            r.set_preferred_instance("youtube.com", "https://evil.example"),
            Err(RegistryError::InvalidInstance("https://evil.example".to_string()))
        );
        assert_eq!(r, before);
    }

    #[test]
    fn test_set_preferred_instance_uses_stored_spelling() {
        let mut r = sample();
        r.set_preferred_instance("youtube.com", "https://INV.nadeko.net/").unwrap();
        assert_eq!(r.get("youtube.com").unwrap().preferred_instance, "https://inv.nadeko.net");
    }

    #[test]
    fn test_add_custom_instance() {
        let mut r = sample();
        r.add_custom_instance("youtube.com", "https://my.invidious.example/").unwrap();
        let entry = r.get("youtube.com").unwrap();
        assert_eq!(entry.custom_instances, vec!["https://my.invidious.example"]);
        assert_eq!(entry.all_instances().count(), 3);

        assert_eq!(
            r.add_custom_instance("youtube.com", "http://plain.example"),
            Err(RegistryError::InvalidUrl("http://plain.example".to_string()))
        );
        assert_eq!(
            r.add_custom_instance("youtube.com", "https://yewtu.be"),
            Err(RegistryError::Duplicate("https://yewtu.be".to_string()))
        );
        assert_eq!(
            r.add_custom_instance("youtube.com", "https://my.invidious.example"),
            Err(RegistryError::Duplicate("https://my.invidious.example".to_string()))
        );
        assert_eq!(r.get("youtube.com").unwrap().all_instances().count(), 3);
    }

    #[test]
    fn test_remove_preferred_custom_instance_resets_preference() {
        let mut r = sample();
        r.add_custom_instance("youtube.com", "https://mine.example").unwrap();
        r.set_preferred_instance("youtube.com", "https://mine.example").unwrap();
        r.remove_custom_instance("youtube.com", "https://mine.example/").unwrap();

        let entry = r.get("youtube.com").unwrap();
        assert!(entry.custom_instances.is_empty());
        assert_eq!(entry.preferred_instance, "https://yewtu.be");
    }

    #[test]
    fn test_remove_unknown_custom_instance() {
        let mut r = sample();
        assert_eq!(
            r.remove_custom_instance("youtube.com", "https://yewtu.be"),
            Err(RegistryError::NotFound("https://yewtu.be".to_string()))
        );
        assert!(matches!(
            r.remove_custom_instance("vimeo.com", "https://a.example"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_reset_to_default_instance() {
        let mut r = sample();
        r.set_preferred_instance("youtube.com", "https://inv.nadeko.net").unwrap();
        r.reset_to_default_instance("youtube.com").unwrap();
        assert_eq!(r.get("youtube.com").unwrap().preferred_instance, "https://yewtu.be");
    }

    #[test]
    fn test_reset_to_defaults_is_idempotent() {
        let mut r = sample();
        r.reset_to_defaults();
        let once = r.clone();
        r.reset_to_defaults();
        assert_eq!(r, once);
        assert_eq!(r, Registry::defaults());
    }

    #[test]
    fn test_effective_instance_self_heals() {
        let mut entry = SiteEntry::new(&["https://a.example", "https://b.example"]);
        entry.preferred_instance = "https://gone.example".to_string();
        assert_eq!(entry.effective_instance(), Some("https://a.example"));

        let mut custom_only = SiteEntry::new(&[]);
        custom_only.custom_instances.push("https://c.example".to_string());
        assert_eq!(custom_only.effective_instance(), Some("https://c.example"));

        assert_eq!(SiteEntry::new(&[]).effective_instance(), None);
    }

    #[test]
    fn test_repair() {
        let mut entry = SiteEntry::new(&["https://a.example", "https://a.example/"]);
        entry.custom_instances = vec![
            "http://insecure.example".to_string(),
            "https://A.example".to_string(),
            "https://C.example/".to_string(),
        ];
        entry.preferred_instance = "https://missing.example".to_string();

        let repairs = entry.repair();
        assert!(repairs.contains(Repairs::DUPLICATES_REMOVED));
        assert!(repairs.contains(Repairs::INVALID_CUSTOM_DROPPED));
        assert!(repairs.contains(Repairs::CUSTOM_NORMALIZED));
        assert!(repairs.contains(Repairs::PREFERRED_RESET));
        assert_eq!(entry.instances, vec!["https://a.example"]);
        assert_eq!(entry.custom_instances, vec!["https://c.example"]);
        assert_eq!(entry.preferred_instance, "https://a.example");

        assert_eq!(entry.repair(), Repairs::empty());
    }

    #[test]
    fn test_repair_drops_non_https_instances() {
        let mut entry = SiteEntry::new(&[
            "javascript:alert(1)",
            "http://plain.example",
            "data:text/html,x",
            "https://ok.example",
        ]);
        let repairs = entry.repair();
        assert!(repairs.contains(Repairs::INVALID_INSTANCE_DROPPED));
        assert!(repairs.contains(Repairs::PREFERRED_RESET));
        assert_eq!(entry.instances, vec!["https://ok.example"]);
        assert_eq!(entry.preferred_instance, "https://ok.example");

        let mut hostile = SiteEntry::new(&["javascript:alert(1)"]);
        hostile.repair();
        assert!(hostile.instances.is_empty());
        assert_eq!(hostile.preferred_instance, "");
        assert_eq!(hostile.effective_instance(), None);
    }

    #[test]
    fn test_get_key_value_normalizes_lookup() {
        let r = sample();
        let (key, entry) = r.get_key_value("YouTube.com.").unwrap();
        assert_eq!(key, "youtube.com");
        assert_eq!(entry.preferred_instance, "https://yewtu.be");
        assert!(r.get_key_value("example.org").is_none());
    }

    #[test]
    fn test_settings_serde_shape() {
        let settings = Settings::new(GlobalState::default(), sample());
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["extensionEnabled"], true);
        assert_eq!(json["siteSettings"]["youtube.com"]["preferredInstance"], "https://yewtu.be");
        assert!(json["siteSettings"]["youtube.com"]["customInstances"].is_array());
        assert!(json["siteSettings"]["youtube.com"].get("pathHandlers").is_none());

        let back: Settings = serde_json::from_value(json).unwrap();
        assert_eq!(back, settings);
    }
}
