use url::Url;

/// Strip the query string and fragment from a URL.
///
/// Listing sites append tracking parameters to every link; the bare URL is
/// what identifies a posting. Unparseable input is returned unchanged.
/// Example: `"https://x.test/jobs/1?refId=abc#top"` → `"https://x.test/jobs/1"`
pub fn strip_query(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => {
            tracing::debug!(url = %raw, "Not a valid URL, leaving as-is");
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://www.linkedin.com/jobs/view/123?refId=abc&trk=x"),
            "https://www.linkedin.com/jobs/view/123"
        );
        assert_eq!(
            strip_query("https://example.com/a#section"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_strip_query_invalid_url() {
        assert_eq!(strip_query("not a url?x=1"), "not a url?x=1");
    }
}
