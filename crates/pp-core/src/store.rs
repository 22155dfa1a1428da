//! Registry store
//!
//! Owns the current settings snapshot. Readers get an `Arc` to an immutable
//! snapshot; writers are serialized, work on a copy and swap it in only when
//! the whole mutation succeeded.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::registry::{Registry, RegistryError, Settings};
use crate::resolver::Resolver;
use crate::types::{Change, Resolution};

/// Error type for the persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

// =============================================================================
// Persistence Seam
// =============================================================================

/// Where settings are loaded from and saved to.
pub trait SettingsBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Settings>, StoreError>;
    fn save(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// In-memory backend. Keeps the last saved document.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saved: Mutex<Option<Settings>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
        }
    }

    pub fn saved(&self) -> Option<Settings> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SettingsBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Settings>, StoreError> {
        Ok(self.saved())
    }

    fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// Outcome of a successful mutation.
#[derive(Debug)]
pub struct Applied {
    pub change: Change,
    /// Set when the new state is live but could not be persisted.
    pub save_error: Option<StoreError>,
}

impl Applied {
    pub fn persisted(&self) -> bool {
        self.save_error.is_none()
    }
}

/// Handle returned by [`RegistryStore::on_registry_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&Settings, Change) + Send + Sync>;

/// A published snapshot and the host-matching order derived from it, so
/// resolution never re-sorts registry keys.
struct Live {
    settings: Arc<Settings>,
    order: Vec<String>,
}

impl Live {
    fn new(settings: Arc<Settings>) -> Arc<Self> {
        let order = settings
            .registry
            .match_order()
            .into_iter()
            .map(str::to_string)
            .collect();
        Arc::new(Self { settings, order })
    }
}

/// Process-owned settings state shared by the resolver and the settings surface.
pub struct RegistryStore {
    current: RwLock<Arc<Live>>,
    writer: Mutex<()>,
    backend: Box<dyn SettingsBackend>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: Mutex<u64>,
}

impl RegistryStore {
    /// Load from the backend. Missing settings become the built-in defaults
    /// (and are saved); unreadable settings are logged and replaced by the
    /// defaults in memory only.
    pub fn open(backend: Box<dyn SettingsBackend>) -> Self {
        let settings = match backend.load() {
            Ok(Some(mut settings)) => {
                settings.registry.repair();
                settings
            }
            Ok(None) => {
                log::info!("No stored settings, initializing defaults");
                let defaults = Settings::defaults();
                if let Err(e) = backend.save(&defaults) {
                    log::error!("Error saving default settings: {}", e);
                }
                defaults
            }
            Err(e) => {
                log::error!("Error loading settings, using defaults: {}", e);
                Settings::defaults()
            }
        };

        Self::with_settings(settings, backend)
    }

    /// Wrap already-loaded settings without touching the backend.
    pub fn with_settings(settings: Settings, backend: Box<dyn SettingsBackend>) -> Self {
        Self {
            current: RwLock::new(Live::new(Arc::new(settings))),
            writer: Mutex::new(()),
            backend,
            listeners: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Consistent view of the current settings.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.live().settings.clone()
    }

    /// Resolve a request against the current snapshot.
    pub fn resolve(&self, request_url: &str) -> Resolution {
        let live = self.live();
        Resolver::with_order(&live.settings, &live.order).resolve(request_url)
    }

    // -------------------------------------------------------------------------
    // Settings surface
    // -------------------------------------------------------------------------

    pub fn set_global_enabled(&self, enabled: bool) -> Applied {
        let applied = self.update(Change::GLOBAL, |s| {
            s.set_global_enabled(enabled);
            Ok(())
        });
        applied.unwrap_or_else(|_| Applied {
            change: Change::GLOBAL,
            save_error: None,
        })
    }

    pub fn set_enabled(&self, domain: &str, enabled: bool) -> Result<Applied, RegistryError> {
        self.update(Change::SITE_ENABLED, |s| s.registry.set_enabled(domain, enabled))
    }

    pub fn set_preferred_instance(&self, domain: &str, url: &str) -> Result<Applied, RegistryError> {
        self.update(Change::PREFERRED, |s| s.registry.set_preferred_instance(domain, url))
    }

    pub fn reset_to_default_instance(&self, domain: &str) -> Result<Applied, RegistryError> {
        self.update(Change::PREFERRED, |s| s.registry.reset_to_default_instance(domain))
    }

    pub fn add_custom_instance(&self, domain: &str, url: &str) -> Result<Applied, RegistryError> {
        self.update(Change::CUSTOM_INSTANCES, |s| s.registry.add_custom_instance(domain, url))
    }

    pub fn remove_custom_instance(&self, domain: &str, url: &str) -> Result<Applied, RegistryError> {
        self.update(Change::CUSTOM_INSTANCES | Change::PREFERRED, |s| {
            s.registry.remove_custom_instance(domain, url)
        })
    }

    pub fn reset_to_defaults(&self) -> Applied {
        let applied = self.update(Change::RESET, |s| {
            s.registry = Registry::defaults();
            Ok(())
        });
        applied.unwrap_or_else(|_| Applied {
            change: Change::RESET,
            save_error: None,
        })
    }

    /// Replace the snapshot after an external update (e.g. storage sync).
    /// The new state is repaired, not persisted again, and announced to
    /// subscribers.
    pub fn apply_external(&self, mut settings: Settings) {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        settings.registry.repair();
        let next = Arc::new(settings);
        self.publish(next.clone());
        self.notify(&next, Change::EXTERNAL);
    }

    /// Save the current snapshot explicitly.
    pub fn save(&self) -> Result<(), StoreError> {
        let snapshot = self.snapshot();
        self.backend.save(&snapshot)
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Register a callback invoked after every applied change.
    ///
    /// Callbacks run while the writer lock is held: they may read snapshots
    /// but must not mutate the store.
    pub fn on_registry_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Settings, Change) + Send + Sync + 'static,
    {
        let mut next_id = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(*next_id);
        *next_id += 1;
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Copy, mutate, swap, persist, notify. Nothing is visible to readers
    /// unless `mutate` succeeds.
    fn update<F>(&self, change: Change, mutate: F) -> Result<Applied, RegistryError>
    where
        F: FnOnce(&mut Settings) -> Result<(), RegistryError>,
    {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = (*self.snapshot()).clone();
        mutate(&mut next)?;

        let next = Arc::new(next);
        self.publish(next.clone());

        let save_error = match self.backend.save(&next) {
            Ok(()) => None,
            Err(e) => {
                log::error!("Error saving settings: {}", e);
                Some(e)
            }
        };

        self.notify(&next, change);
        Ok(Applied { change, save_error })
    }

    fn live(&self) -> Arc<Live> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Swap in a new snapshot. The match order is derived before the write
    /// lock is taken.
    fn publish(&self, settings: Arc<Settings>) {
        let live = Live::new(settings);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = live;
    }

    fn notify(&self, settings: &Settings, change: Change) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(settings, change);
        }
    }
}
