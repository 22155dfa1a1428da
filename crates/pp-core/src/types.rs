//! Core type definitions for Privacy Please
//!
//! Shared by the registry, the resolver and the store. Everything that is
//! persisted derives serde with the camelCase field names the extension's
//! storage already uses.

use serde::{Deserialize, Serialize};

// =============================================================================
// Global State
// =============================================================================

/// Master switch gating all redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalState {
    #[serde(default = "default_true")]
    pub extension_enabled: bool,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            extension_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Resolution
// =============================================================================

/// Final decision for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Leave the request alone
    NoRedirect,
    /// Send the request to `Resolution::redirect_url`
    Redirect,
}

/// Why the resolver reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// `extensionEnabled` is off
    GlobalDisabled,
    /// Request URL could not be parsed
    MalformedUrl,
    /// Not an http(s) request
    UnsupportedScheme,
    /// Host does not belong to any registered site
    NoMatchingSite,
    /// Site is registered but switched off
    SiteDisabled,
    /// Site has no usable instance
    NoInstance,
    /// Target would point back at the requested host
    SelfRedirect,
    /// A path handler produced the target
    PathHandler,
    /// A path handler matched but failed; default rule used instead
    HandlerFallback,
    /// No handler matched; default rule used
    DefaultRule,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::GlobalDisabled => "global_disabled",
            Reason::MalformedUrl => "malformed_url",
            Reason::UnsupportedScheme => "unsupported_scheme",
            Reason::NoMatchingSite => "no_matching_site",
            Reason::SiteDisabled => "site_disabled",
            Reason::NoInstance => "no_instance",
            Reason::SelfRedirect => "self_redirect",
            Reason::PathHandler => "path_handler",
            Reason::HandlerFallback => "handler_fallback",
            Reason::DefaultRule => "default_rule",
        }
    }
}

/// Result of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The final decision for this request
    pub decision: Decision,
    /// Target URL if decision is Redirect
    pub redirect_url: Option<String>,
    /// Registry key that matched the request host (for logging)
    pub site: Option<String>,
    /// Prefix of the path handler that was applied or attempted (for logging)
    pub handler: Option<String>,
    pub reason: Reason,
}

impl Resolution {
    pub(crate) fn skip(reason: Reason) -> Self {
        Self {
            decision: Decision::NoRedirect,
            redirect_url: None,
            site: None,
            handler: None,
            reason,
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.decision == Decision::Redirect
    }
}

// =============================================================================
// Change Flags
// =============================================================================

bitflags::bitflags! {
    /// What a settings update touched. Handed to change subscribers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Change: u8 {
        /// A site was enabled or disabled
        const SITE_ENABLED = 1 << 0;
        /// A preferred instance changed
        const PREFERRED = 1 << 1;
        /// Custom instances were added or removed
        const CUSTOM_INSTANCES = 1 << 2;
        /// The master switch changed
        const GLOBAL = 1 << 3;
        /// Everything was replaced by the built-in defaults
        const RESET = 1 << 4;
        /// Settings were replaced from outside (storage sync)
        const EXTERNAL = 1 << 5;
    }
}

bitflags::bitflags! {
    /// Repairs performed while re-establishing registry invariants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Repairs: u8 {
        /// Preferred instance was not a member and was reset
        const PREFERRED_RESET = 1 << 0;
        /// Duplicate instances were removed
        const DUPLICATES_REMOVED = 1 << 1;
        /// Custom instances failing validation were dropped
        const INVALID_CUSTOM_DROPPED = 1 << 2;
        /// Custom instances were rewritten to their origin form
        const CUSTOM_NORMALIZED = 1 << 3;
        /// Built-in instances that are not https origins were dropped
        const INVALID_INSTANCE_DROPPED = 1 << 4;
    }
}
