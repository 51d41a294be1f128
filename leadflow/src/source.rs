//! Source-platform attribution.
//!
//! Maps the request context of a registration redirect to a marketing
//! channel label. Pure function, kept apart from the HTTP layer so it can
//! be unit-tested in isolation.

/// Label used when neither a query parameter nor a known referrer is present
pub const DIRECT: &str = "Direct";

/// Known referrer substrings and the labels they attribute to
const REFERRER_RULES: [(&str, &str); 9] = [
    ("facebook.com", "Facebook"),
    ("fb.com", "Facebook"),
    ("youtube.com", "YouTube"),
    ("linkedin.com", "LinkedIn"),
    ("whatsapp.com", "WhatsApp"),
    ("wa.me", "WhatsApp"),
    ("instagram.com", "Instagram"),
    ("twitter.com", "Twitter"),
    ("x.com", "Twitter"),
];

/// Derive the source-platform label for a registration.
///
/// An explicit query parameter always wins and is carried verbatim.
/// Otherwise the HTTP referrer is matched against known platform
/// substrings. `Direct` is the total fallback.
pub fn derive_source_platform(explicit: Option<&str>, referrer: Option<&str>) -> String {
    if let Some(source) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return source.to_string();
    }

    if let Some(referrer) = referrer {
        for (needle, label) in REFERRER_RULES {
            if referrer.contains(needle) {
                return label.to_string();
            }
        }
    }

    DIRECT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_source_wins_over_referrer() {
        assert_eq!(
            derive_source_platform(Some("Newsletter"), Some("https://facebook.com/page")),
            "Newsletter"
        );
    }

    #[test]
    fn test_known_referrers_map_to_labels() {
        let cases = [
            ("https://www.facebook.com/groups/1", "Facebook"),
            ("https://fb.com/share", "Facebook"),
            ("https://www.youtube.com/watch?v=abc", "YouTube"),
            ("https://bd.linkedin.com/company/x", "LinkedIn"),
            ("https://api.whatsapp.com/send", "WhatsApp"),
            ("https://wa.me/880170", "WhatsApp"),
            ("https://www.instagram.com/p/1", "Instagram"),
            ("https://twitter.com/u/status", "Twitter"),
            ("https://x.com/u/status", "Twitter"),
        ];
        for (referrer, expected) in cases {
            assert_eq!(derive_source_platform(None, Some(referrer)), expected);
        }
    }

    #[test]
    fn test_unknown_referrer_falls_back_to_direct() {
        assert_eq!(
            derive_source_platform(None, Some("https://example.com/blog")),
            DIRECT
        );
    }

    #[test]
    fn test_absent_context_is_direct() {
        assert_eq!(derive_source_platform(None, None), DIRECT);
        assert_eq!(derive_source_platform(Some("  "), None), DIRECT);
    }
}
