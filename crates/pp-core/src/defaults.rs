//! Built-in default site set.
//!
//! Used on first run, on reset, and to restore path handlers for entries
//! loaded from storage without any.

use crate::registry::{Registry, SiteEntry};
use crate::transform::{Fallback, PathHandler, PathTransform};

const NITTER: &[&str] = &[
    "https://nitter.net",
    "https://xcancel.com",
    "https://nitter.space",
    "https://nitter.privacyredirect.com",
    "https://lightbrd.com",
    "https://nitter.poast.org",
    "https://nitter.tiekoetter.com",
];

fn segment(marker: &str) -> PathHandler {
    PathHandler::new(marker, PathTransform::path_segment(marker, &format!("{}{{}}", marker)))
}

fn twitter_handlers() -> Vec<PathHandler> {
    vec![PathHandler::new(
        "/search",
        PathTransform::query_param("q", "/search?q={}", Fallback::Passthrough),
    )]
}

/// Built-in handlers for a domain, in matching order.
pub fn default_handlers(domain: &str) -> Vec<PathHandler> {
    match domain {
        "youtube.com" => vec![
            PathHandler::new(
                "/watch",
                PathTransform::query_param("v", "/watch?v={}", Fallback::Passthrough),
            ),
            segment("/channel/"),
            segment("/user/"),
            PathHandler::new(
                "/playlist",
                PathTransform::query_param("list", "/playlist?list={}", Fallback::Passthrough),
            ),
            segment("/c/"),
        ],
        "twitter.com" | "x.com" => twitter_handlers(),
        "reddit.com" => vec![
            PathHandler::new("/r/", PathTransform::Passthrough),
            PathHandler::new("/user/", PathTransform::Passthrough),
        ],
        "instagram.com" => vec![segment("/p/")],
        "tiktok.com" => vec![
            PathHandler::new("/@", PathTransform::template(&["/{@0}"])),
            segment("/video/"),
        ],
        "google.com" => vec![PathHandler::new(
            "/search",
            PathTransform::query_param("q", "/search?q={}", Fallback::Root),
        )],
        "translate.google.com" => vec![PathHandler::new(
            "/",
            PathTransform::template(&["/{sl|auto}/{tl|en}/{text}", "/{sl|auto}/{tl|en}"]),
        )],
        "medium.com" => vec![PathHandler::new("/", PathTransform::PathOnly)],
        "imgur.com" => vec![segment("/a/"), segment("/gallery/")],
        "imdb.com" => vec![segment("/title/"), segment("/name/")],
        _ => Vec::new(),
    }
}

/// The built-in registry.
pub fn default_registry() -> Registry {
    let sites: &[(&str, &[&str])] = &[
        ("music.youtube.com", &["https://beatbump.io", "https://music.youtube.com"]),
        (
            "youtube.com",
            &[
                "https://yewtu.be",
                "https://inv.nadeko.net",
                "https://invidious.nerdvpn.de",
                "https://id.420129.xyz",
            ],
        ),
        ("twitter.com", NITTER),
        ("x.com", NITTER),
        (
            "reddit.com",
            &[
                "https://safereddit.com",
                "https://eu.safereddit.com",
                "https://l.opnxng.com",
                "https://redlib.perennialte.ch",
                "https://redlib.tux.pizza",
                "https://libreddit.privacydev.net",
                "https://rl.bloat.cat",
                "https://redlib.privacyredirect.com",
                "https://reddit.nerdvpn.de",
                "https://redlib.4o1x5.dev",
                "https://reddit.adminforge.de",
                "https://rl.blitzw.in",
                "https://reddit.rtrace.io",
                "https://lr.ptr.moe",
                "https://redlib.orangenet.cc",
                "https://redlib.privadency.com",
                "https://redlib.minihoot.site",
            ],
        ),
        ("instagram.com", &["https://proxigram.lunar.icu", "https://imginn.com"]),
        (
            "tiktok.com",
            &[
                "https://tok.artemislena.eu",
                "https://proxitok.pussthecat.org",
                "https://tok.adminforge.de",
                "https://cringe.whatever.social",
                "https://proxitok.lunar.icu",
                "https://proxitok.belloworld.it",
            ],
        ),
        (
            "translate.google.com",
            &[
                "https://lingva.ml",
                "https://lingva.garudalinux.org",
                "https://translate.plausibility.cloud",
                "https://lingva.lunar.icu",
                "https://translate.projectsegfau.lt",
            ],
        ),
        (
            "google.com",
            &[
                "https://search.disroot.org",
                "https://searx.be",
                "https://priv.au",
                "https://search.rhscz.eu",
                "https://searx.tuxcloud.net",
                "https://search.funami.tech",
                "https://librey.sny.sh",
                "https://search.liv.town",
            ],
        ),
        (
            "medium.com",
            &[
                "https://scribe.rip",
                "https://scribe.nixnet.services",
                "https://scribe.rawbit.ninja",
                "https://m.opnxng.com",
                "https://scribe.privacyredirect.com",
            ],
        ),
        (
            "imgur.com",
            &[
                "https://r.opnxng.com",
                "https://imgur.artemislena.eu",
                "https://rimgo.totaldarkness.net",
                "https://rimgo.bloat.cat",
                "https://rimgo.pussthecat.org",
            ],
        ),
        (
            "quora.com",
            &[
                "https://quetre.iket.me",
                "https://quetre.blackdrgn.nl",
                "https://q.opnxng.com",
                "https://quetre.canine.tools",
                "https://qt.bloat.cat",
                "https://quetre.pussthecat.org",
            ],
        ),
        (
            "imdb.com",
            &[
                "https://libremdb.iket.me",
                "https://d.opnxng.com",
                "https://lmdb.bloat.cat",
                "https://libremdb.catsarch.com",
                "https://imdb.nerdvpn.de",
                "https://libremdb.canine.tools",
            ],
        ),
        ("stackoverflow.com", &["https://code.whatever.social"]),
        (
            "tumblr.com",
            &[
                "https://pb.bloat.cat",
                "https://tb.opnxng.com",
                "https://priviblur.pussthecat.org",
                "https://priviblur.thebunny.zone",
                "https://priviblur.canine.tools",
                "https://pb.cleberg.net",
                "https://tumblr.nerdvpn.de",
            ],
        ),
        ("twitch.tv", &["https://safetwitch.drgns.space"]),
    ];

    let mut registry = Registry::new();
    for (domain, instances) in sites {
        registry.insert(
            domain,
            SiteEntry::new(instances).with_handlers(default_handlers(domain)),
        );
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Repairs;

    #[test]
    fn test_defaults_satisfy_invariants() {
        let mut registry = default_registry();
        assert_eq!(registry.len(), 16);
        for (domain, entry) in registry.iter() {
            assert!(!entry.instances.is_empty(), "{} has no instances", domain);
            assert_eq!(entry.preferred_instance, entry.instances[0]);
            assert!(entry.enabled);
        }
        assert_eq!(registry.repair(), Repairs::empty());
    }

    #[test]
    fn test_handler_tables() {
        let youtube = default_handlers("youtube.com");
        let prefixes: Vec<&str> = youtube.iter().map(|h| h.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["/watch", "/channel/", "/user/", "/playlist", "/c/"]);

        assert_eq!(default_handlers("x.com"), default_handlers("twitter.com"));
        assert!(default_handlers("quora.com").is_empty());
        assert_eq!(
            default_handlers("imgur.com")[0].transform,
            PathTransform::path_segment("/a/", "/a/{}")
        );
    }
}
