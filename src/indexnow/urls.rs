use std::collections::HashSet;

/// Canonical pages pinged on every build, on top of the freshly modified ones.
pub const FALLBACK_PATHS: [&str; 15] = [
    "/",
    "/sitemap.xml",
    "/sitemap-en.xml",
    "/fr/sitemap-fr.xml",
    "/blog/",
    "/fr/blog/",
    "/blog/heygen-update-2025",
    "/fr/blog/mise-a-jour-heygen-2025",
    "/blog/heygen-ai-review",
    "/fr/blog/avis-heygen-ai",
    "/legal-notice",
    "/privacy-policy",
    "/fr/",
    "/fr/mentions-legales",
    "/fr/politique-de-confidentialite",
];

/// Splits the comma separated list, trimming entries and dropping the empty ones.
pub fn parse_modified_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Absolute urls are kept as they are, paths get joined to `base_url`.
pub fn qualify(base_url: &str, entry: &str) -> String {
    if entry.starts_with("http") {
        entry.to_string()
    } else if entry.starts_with('/') {
        format!("{base_url}{entry}")
    } else {
        format!("{base_url}/{entry}")
    }
}

/// Modified entries first, then the fallback pages, every url listed once.
pub fn build_url_list(base_url: &str, modified: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();

    modified
        .iter()
        .map(String::as_str)
        .chain(FALLBACK_PATHS)
        .map(|entry| qualify(base_url, entry))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
