//! Child window id tagging.
//!
//! A child window's URL carries its id as a query parameter so the page
//! (and a platform that only sees the URL of a popup) can tell which
//! window it is.

use std::sync::LazyLock;

use regex::Regex;
use tether_common::WindowId;

/// Query parameter carrying the window id.
pub const WINDOW_ID_PARAM: &str = "____window_id";

static WINDOW_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]____window_id=(\d+)(?:[&#]|$)").unwrap());

/// Append `____window_id=<id>` to `url` unless it already carries it.
pub fn tag_url(url: &str, id: WindowId) -> String {
    if extract_window_id(url) == Some(id) {
        return url.to_string();
    }

    let (base, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{WINDOW_ID_PARAM}={}{fragment}", id.as_i32())
}

/// Recover the window id from a tagged URL.
pub fn extract_window_id(url: &str) -> Option<WindowId> {
    WINDOW_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .map(WindowId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_query() {
        assert_eq!(
            tag_url("http://localhost:3030/child.html", WindowId(100)),
            "http://localhost:3030/child.html?____window_id=100"
        );
    }

    #[test]
    fn extends_existing_query() {
        assert_eq!(
            tag_url("http://localhost:3030/child.html?a=1", WindowId(7)),
            "http://localhost:3030/child.html?a=1&____window_id=7"
        );
    }

    #[test]
    fn keeps_fragment_last() {
        assert_eq!(
            tag_url("http://localhost/page#top", WindowId(2)),
            "http://localhost/page?____window_id=2#top"
        );
    }

    #[test]
    fn already_tagged_is_unchanged() {
        let url = "http://localhost/child.html?____window_id=100";
        assert_eq!(tag_url(url, WindowId(100)), url);
    }

    #[test]
    fn extract_round_trip() {
        let url = tag_url("http://localhost/child.html?x=y", WindowId(42));
        assert_eq!(extract_window_id(&url), Some(WindowId(42)));
    }

    #[test]
    fn extract_missing_or_malformed() {
        assert_eq!(extract_window_id("http://localhost/child.html"), None);
        assert_eq!(extract_window_id("http://localhost/?____window_id=abc"), None);
        assert_eq!(extract_window_id("http://localhost/?x____window_id=5"), None);
    }
}
