//! End-to-end redirect scenarios against the built-in defaults.

use pp_core::{
    resolve, Decision, MemoryBackend, Reason, Registry, RegistryError, RegistryStore, Settings,
    SiteEntry,
};

fn defaults() -> Settings {
    Settings::defaults()
}

fn target(settings: &Settings, url: &str) -> Option<String> {
    resolve(settings, url).redirect_url
}

#[test]
fn youtube_watch_keeps_video_id() {
    let s = defaults();
    assert_eq!(
        target(&s, "https://www.youtube.com/watch?v=abc123").as_deref(),
        Some("https://yewtu.be/watch?v=abc123")
    );
    assert_eq!(
        target(&s, "https://youtube.com/watch?v=abc123&list=PL1&pp=tracking").as_deref(),
        Some("https://yewtu.be/watch?v=abc123")
    );
}

#[test]
fn youtube_channel_user_and_playlist() {
    let s = defaults();
    assert_eq!(
        target(&s, "https://www.youtube.com/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw/videos").as_deref(),
        Some("https://yewtu.be/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw")
    );
    assert_eq!(
        target(&s, "https://youtube.com/user/someone/featured").as_deref(),
        Some("https://yewtu.be/user/someone")
    );
    assert_eq!(
        target(&s, "https://youtube.com/playlist?list=PL123&si=abc").as_deref(),
        Some("https://yewtu.be/playlist?list=PL123")
    );
    assert_eq!(
        target(&s, "https://youtube.com/c/SomeName/about").as_deref(),
        Some("https://yewtu.be/c/SomeName")
    );
}

#[test]
fn youtube_watch_without_id_passes_through() {
    let s = defaults();
    assert_eq!(
        target(&s, "https://youtube.com/watch?t=5").as_deref(),
        Some("https://yewtu.be/watch?t=5")
    );
}

#[test]
fn music_subdomain_uses_its_own_entry() {
    let mut s = defaults();
    s.registry
        .set_preferred_instance("music.youtube.com", "https://beatbump.io")
        .unwrap();

    let r = resolve(&s, "https://music.youtube.com/watch?v=abc123");
    assert_eq!(r.site.as_deref(), Some("music.youtube.com"));
    assert_eq!(r.redirect_url.as_deref(), Some("https://beatbump.io/watch?v=abc123"));

    s.registry.set_enabled("music.youtube.com", false).unwrap();
    let r = resolve(&s, "https://music.youtube.com/watch?v=abc123");
    assert_eq!(r.decision, Decision::NoRedirect);
    assert_eq!(r.site.as_deref(), Some("music.youtube.com"));
}

#[test]
fn twitter_search_is_reencoded() {
    let s = defaults();
    assert_eq!(
        target(&s, "https://twitter.com/search?q=test").as_deref(),
        Some("https://nitter.net/search?q=test")
    );
    assert_eq!(
        target(&s, "https://x.com/search?q=rust%20lang&src=typed_query").as_deref(),
        Some("https://nitter.net/search?q=rust%20lang")
    );
    assert_eq!(
        target(&s, "https://x.com/someone/status/1").as_deref(),
        Some("https://nitter.net/someone/status/1")
    );
}

#[test]
fn google_search_and_translate() {
    let s = defaults();
    assert_eq!(
        target(&s, "https://www.google.com/search?q=privacy&oq=privacy&sourceid=chrome").as_deref(),
        Some("https://search.disroot.org/search?q=privacy")
    );
    assert_eq!(
        target(&s, "https://www.google.com/search?tbm=isch").as_deref(),
        Some("https://search.disroot.org/")
    );
    assert_eq!(
        target(&s, "https://translate.google.com/?sl=en&tl=de&text=hello%20world&op=translate")
            .as_deref(),
        Some("https://lingva.ml/en/de/hello%20world")
    );
    assert_eq!(
        target(&s, "https://translate.google.com/").as_deref(),
        Some("https://lingva.ml/auto/en")
    );
}

#[test]
fn tiktok_imgur_imdb_medium_instagram() {
    let s = defaults();
    assert_eq!(
        target(&s, "https://www.tiktok.com/@creator?lang=en").as_deref(),
        Some("https://tok.artemislena.eu/@creator")
    );
    assert_eq!(
        target(&s, "https://imgur.com/gallery/Abc12/comment/1").as_deref(),
        Some("https://r.opnxng.com/gallery/Abc12")
    );
    assert_eq!(
        target(&s, "https://www.imdb.com/title/tt0111161/?ref_=nv_sr").as_deref(),
        Some("https://libremdb.iket.me/title/tt0111161")
    );
    assert_eq!(
        target(&s, "https://medium.com/@writer/post-123?source=rss").as_deref(),
        Some("https://scribe.rip/@writer/post-123")
    );
    assert_eq!(
        target(&s, "https://www.instagram.com/p/Cxyz/?igsh=abc").as_deref(),
        Some("https://proxigram.lunar.icu/p/Cxyz")
    );
}

#[test]
fn sites_without_handlers_use_default_rule() {
    let s = defaults();
    let r = resolve(&s, "https://www.quora.com/How-do-I-learn-Rust?top_ans=1");
    assert_eq!(r.reason, Reason::DefaultRule);
    assert_eq!(
        r.redirect_url.as_deref(),
        Some("https://quetre.iket.me/How-do-I-learn-Rust?top_ans=1")
    );
}

#[test]
fn disabled_everything_never_redirects() {
    let mut s = defaults();
    s.set_global_enabled(false);
    for url in [
        "https://youtube.com/watch?v=1",
        "https://twitter.com/search?q=a",
        "https://reddit.com/r/rust",
    ] {
        assert_eq!(resolve(&s, url).decision, Decision::NoRedirect);
    }

    let mut s = defaults();
    s.registry.set_enabled("reddit.com", false).unwrap();
    for path in ["/", "/r/rust", "/user/x", "/r/rust/comments/abc"] {
        let url = format!("https://www.reddit.com{}", path);
        assert_eq!(resolve(&s, &url).reason, Reason::SiteDisabled);
    }
}

#[test]
fn broken_handler_falls_back_to_default_rule() {
    let s = defaults();
    let r = resolve(&s, "https://imdb.com/title/");
    assert_eq!(r.reason, Reason::HandlerFallback);
    assert_eq!(r.redirect_url.as_deref(), Some("https://libremdb.iket.me/title/"));
}

#[test]
fn custom_instance_lifecycle_through_store() {
    let store = RegistryStore::open(Box::new(MemoryBackend::new()));

    store.add_custom_instance("youtube.com", "https://tube.mine.example/").unwrap();
    store
        .set_preferred_instance("youtube.com", "https://tube.mine.example")
        .unwrap();
    assert_eq!(
        store.resolve("https://youtube.com/watch?v=abc").redirect_url.as_deref(),
        Some("https://tube.mine.example/watch?v=abc")
    );

    assert_eq!(
        store
            .add_custom_instance("youtube.com", "http://tube.mine.example")
            .unwrap_err(),
        RegistryError::InvalidUrl("http://tube.mine.example".to_string())
    );

    store
        .remove_custom_instance("youtube.com", "https://tube.mine.example")
        .unwrap();
    assert_eq!(
        store.resolve("https://youtube.com/watch?v=abc").redirect_url.as_deref(),
        Some("https://yewtu.be/watch?v=abc")
    );
}

#[test]
fn custom_registry_without_handlers() {
    let mut registry = Registry::new();
    registry.insert("example.org", SiteEntry::new(&["https://mirror.example"]));
    let s = Settings::new(Default::default(), registry);
    assert_eq!(
        target(&s, "http://www.example.org/a/b?c=d").as_deref(),
        Some("https://mirror.example/a/b?c=d")
    );
}
