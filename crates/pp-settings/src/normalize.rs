use pp_core::defaults::{default_handlers, default_registry};
use pp_core::{Repairs, Settings};

pub struct NormalizeStats {
    pub sites: usize,
    pub sites_added: usize,
    pub handlers_restored: usize,
    pub repaired_sites: usize,
    pub repairs: Repairs,
}

impl NormalizeStats {
    pub fn changed(&self) -> bool {
        self.sites_added > 0 || self.handlers_restored > 0 || self.repaired_sites > 0
    }
}

/// Bring a parsed settings document up to date with the built-in site set
/// and re-establish every entry invariant.
///
/// - built-in sites missing from the document are added with their defaults
/// - entries stored without handlers get the built-in handlers back
/// - each entry is repaired (non-https instances, custom instances, duplicates,
///   preferred instance)
pub fn normalize_settings(settings: &mut Settings) -> NormalizeStats {
    let registry = &mut settings.registry;

    let mut sites_added = 0usize;
    for (domain, entry) in default_registry().iter() {
        if !registry.contains(domain) {
            registry.insert(domain, entry.clone());
            sites_added += 1;
        }
    }

    let mut handlers_restored = 0usize;
    let mut repaired_sites = 0usize;
    let mut repairs = Repairs::empty();

    for (domain, entry) in registry.iter_mut() {
        if entry.path_handlers.is_empty() {
            let handlers = default_handlers(domain);
            if !handlers.is_empty() {
                entry.path_handlers = handlers;
                handlers_restored += 1;
            }
        }

        let entry_repairs = entry.repair();
        if !entry_repairs.is_empty() {
            log::warn!("Repaired settings for {}: {:?}", domain, entry_repairs);
            repaired_sites += 1;
            repairs |= entry_repairs;
        }
    }

    NormalizeStats {
        sites: registry.len(),
        sites_added,
        handlers_restored,
        repaired_sites,
        repairs,
    }
}
