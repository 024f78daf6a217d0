use std::collections::HashSet;

use url::Url;

/// Destinations that are never instrumented, matched by full URL, hostname or path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    entries: HashSet<String>,
}

impl ExclusionList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(Into::into)
            .map(|entry: String| {
                let trimmed = entry.trim();
                // Absolute URLs are stored normalized so they compare against `Url::as_str`.
                match Url::parse(trimmed) {
                    Ok(url) if url.has_host() => url.to_string(),
                    _ => trimmed.to_string(),
                }
            })
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { entries }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// True when `url` must not be instrumented.
    pub fn excludes(&self, url: &Url) -> bool {
        if is_inert_url(url.as_str()) {
            return true;
        }
        if self.contains(url.as_str()) {
            return true;
        }
        if url.host_str().is_some_and(|host| self.contains(host)) {
            return true;
        }
        self.contains(url.path())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `about:`, `javascript:` and `data:` URLs never cause network activity.
pub fn is_inert_url(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    lower.starts_with("about:") || lower.starts_with("javascript:") || lower.starts_with("data:")
}

/// Resolves a possibly relative reference against the page URL.
pub fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inert_schemes_are_case_insensitive() {
        assert!(is_inert_url("about:blank"));
        assert!(is_inert_url("JavaScript:void(0)"));
        assert!(is_inert_url("data:image/png;base64,AAAA"));
        assert!(!is_inert_url("https://example.com/a.png"));
    }

    #[test]
    fn matches_full_url_host_or_path() {
        let list = ExclusionList::new(["https://stats.example.com", "cdn.example.net", "/beacon"]);

        let full = Url::parse("https://stats.example.com/").unwrap();
        let host = Url::parse("https://cdn.example.net/lib.js").unwrap();
        let path = Url::parse("https://example.com/beacon").unwrap();
        let other = Url::parse("https://example.com/api").unwrap();

        assert!(list.excludes(&full));
        assert!(list.excludes(&host));
        assert!(list.excludes(&path));
        assert!(!list.excludes(&other));
    }

    #[test]
    fn relative_references_resolve_against_page() {
        let base = Url::parse("https://example.com/app/page").unwrap();
        let resolved = resolve_url("img/a.png", Some(&base)).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/app/img/a.png");
        assert!(resolve_url("img/a.png", None).is_none());
        assert!(resolve_url("   ", Some(&base)).is_none());
    }
}
