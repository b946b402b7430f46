use once_cell::sync::Lazy;
use regex::Regex;

static LONG_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/watch\?(?:[^#]*&)?v=([0-9A-Za-z_-]+)").expect("long form pattern")
});

static SHORT_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtu\.be/([0-9A-Za-z_-]+)").expect("short form pattern"));

/// Recovers the video id from a `watch?v=` or `youtu.be/` URL.
pub fn extract(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    [&*LONG_FORM, &*SHORT_FORM]
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}

/// Canonical watch URL for an id, used in reports.
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form() {
        assert_eq!(extract("https://youtu.be/abc123").as_deref(), Some("abc123"));
        assert_eq!(
            extract("https://youtu.be/dQw4w9WgXcQ?t=30").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn long_form() {
        assert_eq!(
            extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract("https://m.youtube.com/watch?v=a-b_c&list=PLrAXtmRdnEQy").as_deref(),
            Some("a-b_c")
        );
        assert_eq!(
            extract("youtube.com/watch?feature=share&v=xyz789#t=1").as_deref(),
            Some("xyz789")
        );
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(extract("  https://youtu.be/abc123\n").as_deref(), Some("abc123"));
    }

    #[test]
    fn rejects_other_shapes() {
        for url in [
            "",
            "abc123",
            "https://vimeo.com/123456789",
            "https://www.youtube.com/playlist?list=PLrAXtmRdnEQy",
            "https://www.youtube.com/watch?list=PL1",
            "https://youtu.be/",
        ] {
            assert_eq!(extract(url), None, "{url}");
        }
    }

    #[test]
    fn watch_url_round_trips_through_extract() {
        assert_eq!(extract(&watch_url("abc123")).as_deref(), Some("abc123"));
    }
}
