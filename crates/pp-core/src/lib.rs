//! Privacy Please Core Library
//!
//! This crate provides the redirect engine for the Privacy Please extension:
//! requests to well-known sites are rewritten toward privacy-respecting
//! alternative front-ends ("instances").
//!
//! # Architecture
//!
//! A [`Registry`] maps source domains to their redirect configuration. The
//! [`Resolver`] turns a request URL plus a settings snapshot into a
//! [`Resolution`]; it never writes and never fails loudly. All writes go
//! through [`RegistryStore`], which swaps in a fresh snapshot per mutation
//! and hands persistence to a [`SettingsBackend`].
//!
//! # Modules
//!
//! - `registry`: Site entries, registry mutations, the settings document
//! - `resolver`: Host matching and URL rewriting
//! - `transform`: Data-described path handlers and their evaluator
//! - `defaults`: Built-in site set
//! - `store`: Snapshot ownership, persistence seam, change subscriptions
//! - `url`: URL helpers
//! - `types`: Shared type definitions

pub mod defaults;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod transform;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use registry::{Registry, RegistryError, Settings, SiteEntry};
pub use resolver::{resolve, Resolver};
pub use store::{Applied, MemoryBackend, RegistryStore, SettingsBackend, StoreError, SubscriptionId};
pub use transform::{Fallback, PathHandler, PathTransform, TransformError};
pub use types::{Change, Decision, GlobalState, Reason, Repairs, Resolution};
