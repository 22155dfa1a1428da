//! WebAssembly bindings for Privacy Please

use std::sync::OnceLock;

use log::LevelFilter;
use wasm_bindgen::prelude::*;

use pp_core::{Applied, Decision, MemoryBackend, RegistryError, RegistryStore, Resolution, Settings};
use pp_settings::{load_settings, to_json};

mod console;

static STORE: OnceLock<RegistryStore> = OnceLock::new();

/// Initialize from the document kept in extension storage, or from the
/// built-in defaults when nothing was stored yet.
///
/// The JS side owns persistence: after each mutation it writes the returned
/// `settings` back to storage.
#[wasm_bindgen]
pub fn init(settings_json: Option<String>, log_level: Option<String>) -> Result<(), JsValue> {
    let level = log_level
        .as_deref()
        .and_then(console::parse_level)
        .unwrap_or(LevelFilter::Info);
    console::install(level);

    if STORE.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the extension to reinitialize."));
    }

    let settings = initial_settings(settings_json.as_deref()).map_err(|e| JsValue::from_str(&e))?;
    log::info!(
        "Initialized with {} sites (extension {})",
        settings.registry.len(),
        if settings.extension_enabled() { "enabled" } else { "disabled" }
    );

    STORE
        .set(RegistryStore::with_settings(settings, Box::new(MemoryBackend::new())))
        .map_err(|_| JsValue::from_str("Failed to set settings state"))?;

    Ok(())
}

#[wasm_bindgen(js_name = isInitialized)]
pub fn is_initialized() -> bool {
    STORE.get().is_some()
}

#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> bool {
    match console::parse_level(level) {
        Some(filter) => {
            log::set_max_level(filter);
            true
        }
        None => false,
    }
}

/// Redirect target for a main-frame navigation, if any.
#[wasm_bindgen]
pub fn resolve(url: &str) -> Option<String> {
    STORE.get().and_then(|store| store.resolve(url).redirect_url)
}

#[wasm_bindgen(js_name = resolveDetailed)]
pub fn resolve_detailed(url: &str) -> JsValue {
    let result = js_sys::Object::new();
    let store = match STORE.get() {
        Some(store) => store,
        None => {
            let _ = js_sys::Reflect::set(&result, &"redirect".into(), &JsValue::from(false));
            let _ = js_sys::Reflect::set(&result, &"reason".into(), &JsValue::from_str("not_initialized"));
            return result.into();
        }
    };

    let resolution: Resolution = store.resolve(url);
    let _ = js_sys::Reflect::set(
        &result,
        &"redirect".into(),
        &JsValue::from(resolution.decision == Decision::Redirect),
    );
    let _ = js_sys::Reflect::set(&result, &"reason".into(), &JsValue::from_str(resolution.reason.as_str()));
    if let Some(target) = resolution.redirect_url {
        let _ = js_sys::Reflect::set(&result, &"redirectUrl".into(), &JsValue::from_str(&target));
    }
    if let Some(site) = resolution.site {
        let _ = js_sys::Reflect::set(&result, &"site".into(), &JsValue::from_str(&site));
    }
    if let Some(handler) = resolution.handler {
        let _ = js_sys::Reflect::set(&result, &"handler".into(), &JsValue::from_str(&handler));
    }
    result.into()
}

#[wasm_bindgen(js_name = getSettings)]
pub fn get_settings() -> Result<JsValue, JsValue> {
    let store = store()?;
    settings_value(&store.snapshot())
}

/// Replace the live settings after storage changed elsewhere (another
/// window, sync from another device).
#[wasm_bindgen(js_name = applyExternalSettings)]
pub fn apply_external_settings(settings_json: &str) -> JsValue {
    let store = match store() {
        Ok(store) => store,
        Err(e) => return failure_value(e, "not_initialized"),
    };

    match load_settings(settings_json) {
        Ok((settings, stats)) => {
            if stats.changed() {
                log::debug!("External settings normalized: {} repaired", stats.repaired_sites);
            }
            store.apply_external(settings);
            success_value(store, None)
        }
        Err(e) => {
            log::warn!("Ignoring external settings: {}", e);
            failure_value(JsValue::from_str(&e.to_string()), "invalid_settings")
        }
    }
}

#[wasm_bindgen(js_name = setGlobalEnabled)]
pub fn set_global_enabled(enabled: bool) -> JsValue {
    mutate(|store| Ok(store.set_global_enabled(enabled)))
}

#[wasm_bindgen(js_name = setSiteEnabled)]
pub fn set_site_enabled(domain: &str, enabled: bool) -> JsValue {
    mutate(|store| store.set_enabled(domain, enabled))
}

#[wasm_bindgen(js_name = setPreferredInstance)]
pub fn set_preferred_instance(domain: &str, instance: &str) -> JsValue {
    mutate(|store| store.set_preferred_instance(domain, instance))
}

#[wasm_bindgen(js_name = resetToDefaultInstance)]
pub fn reset_to_default_instance(domain: &str) -> JsValue {
    mutate(|store| store.reset_to_default_instance(domain))
}

#[wasm_bindgen(js_name = addCustomInstance)]
pub fn add_custom_instance(domain: &str, instance: &str) -> JsValue {
    mutate(|store| store.add_custom_instance(domain, instance))
}

#[wasm_bindgen(js_name = removeCustomInstance)]
pub fn remove_custom_instance(domain: &str, instance: &str) -> JsValue {
    mutate(|store| store.remove_custom_instance(domain, instance))
}

#[wasm_bindgen(js_name = resetSettings)]
pub fn reset_settings() -> JsValue {
    mutate(|store| Ok(store.reset_to_defaults()))
}

fn initial_settings(settings_json: Option<&str>) -> Result<Settings, String> {
    match settings_json {
        Some(text) if !text.trim().is_empty() => load_settings(text)
            .map(|(settings, _)| settings)
            .map_err(|e| format!("Failed to load settings: {}", e)),
        _ => Ok(Settings::defaults()),
    }
}

fn store() -> Result<&'static RegistryStore, JsValue> {
    STORE
        .get()
        .ok_or_else(|| JsValue::from_str("Not initialized. Call init() first."))
}

fn mutate<F>(op: F) -> JsValue
where
    F: FnOnce(&RegistryStore) -> Result<Applied, RegistryError>,
{
    let store = match store() {
        Ok(store) => store,
        Err(e) => return failure_value(e, "not_initialized"),
    };

    match op(store) {
        Ok(applied) => success_value(store, Some(&applied)),
        Err(e) => {
            let result = failure_value(JsValue::from_str(&e.to_string()), e.code());
            if let Ok(settings) = settings_value(&store.snapshot()) {
                let _ = js_sys::Reflect::set(&result, &"settings".into(), &settings);
            }
            result
        }
    }
}

fn settings_value(settings: &Settings) -> Result<JsValue, JsValue> {
    let json = to_json(settings).map_err(|e| JsValue::from_str(&format!("Failed to serialize settings: {}", e)))?;
    js_sys::JSON::parse(&json)
}

fn success_value(store: &RegistryStore, applied: Option<&Applied>) -> JsValue {
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"success".into(), &JsValue::from(true));
    if let Some(applied) = applied {
        let _ = js_sys::Reflect::set(&result, &"change".into(), &JsValue::from(applied.change.bits()));
    }
    match settings_value(&store.snapshot()) {
        Ok(settings) => {
            let _ = js_sys::Reflect::set(&result, &"settings".into(), &settings);
        }
        Err(e) => {
            let _ = js_sys::Reflect::set(&result, &"error".into(), &e);
        }
    }
    result.into()
}

fn failure_value(error: JsValue, code: &str) -> JsValue {
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"success".into(), &JsValue::from(false));
    let _ = js_sys::Reflect::set(&result, &"error".into(), &error);
    let _ = js_sys::Reflect::set(&result, &"code".into(), &JsValue::from_str(code));
    result.into()
}
