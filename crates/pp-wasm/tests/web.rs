//! Browser-side tests. Run with `wasm-pack test --headless --firefox crates/pp-wasm`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use pp_wasm::*;

wasm_bindgen_test_configure!(run_in_browser);

fn field(value: &JsValue, name: &str) -> JsValue {
    js_sys::Reflect::get(value, &JsValue::from_str(name)).unwrap()
}

fn ensure_init() {
    if !is_initialized() {
        init(None, Some("debug".to_string())).unwrap();
    }
}

#[wasm_bindgen_test]
fn resolves_after_init() {
    ensure_init();
    assert!(init(None, None).is_err());
    assert_eq!(
        resolve("https://www.youtube.com/watch?v=abc123").as_deref(),
        Some("https://yewtu.be/watch?v=abc123")
    );
    assert_eq!(resolve("https://docs.rs/"), None);

    let detailed = resolve_detailed("https://quora.com/Topic");
    assert_eq!(field(&detailed, "redirect").as_bool(), Some(true));
    assert_eq!(field(&detailed, "reason").as_string().as_deref(), Some("default_rule"));
    assert_eq!(field(&detailed, "site").as_string().as_deref(), Some("quora.com"));
}

#[wasm_bindgen_test]
fn mutation_results_carry_settings() {
    ensure_init();

    let ok = add_custom_instance("imdb.com", "https://imdb.mine.example");
    assert_eq!(field(&ok, "success").as_bool(), Some(true));
    let settings = field(&ok, "settings");
    let imdb = field(&field(&settings, "siteSettings"), "imdb.com");
    let custom = js_sys::Array::from(&field(&imdb, "customInstances"));
    assert_eq!(custom.get(0).as_string().as_deref(), Some("https://imdb.mine.example"));

    let failed = set_preferred_instance("imdb.com", "https://unknown.example");
    assert_eq!(field(&failed, "success").as_bool(), Some(false));
    assert_eq!(field(&failed, "code").as_string().as_deref(), Some("invalid_instance"));

    let missing = set_site_enabled("nowhere.example", false);
    assert_eq!(field(&missing, "code").as_string().as_deref(), Some("not_found"));

    let reset = reset_settings();
    assert_eq!(field(&reset, "success").as_bool(), Some(true));
}

#[wasm_bindgen_test]
fn external_settings_replace_state() {
    ensure_init();

    let bad = apply_external_settings("{ nope");
    assert_eq!(field(&bad, "code").as_string().as_deref(), Some("invalid_settings"));

    let applied = apply_external_settings(r#"{ "extensionEnabled": false }"#);
    assert_eq!(field(&applied, "success").as_bool(), Some(true));
    assert_eq!(resolve("https://youtube.com/watch?v=abc123"), None);

    set_global_enabled(true);
    assert!(resolve("https://youtube.com/watch?v=abc123").is_some());
}
