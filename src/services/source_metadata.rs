//! Pure helpers deriving display metadata from search-result URLs.
//!
//! No network calls happen here; the favicon reference points at DuckDuckGo's
//! icon service and the site name is prettified from the domain alone.

use url::Url;

/// Second-level registrable suffixes that need the third label from the right
/// as the site name (e.g. `bbc.co.uk` -> "Bbc").
const COMPOUND_TLDS: &[&str] = &["co.uk", "com.au", "co.jp", "co.kr"];

const COMMON_TLDS: &[&str] = &[
    "com", "org", "net", "edu", "gov", "io", "co", "uk", "de", "fr", "jp", "au", "ca",
];

fn domain_of(raw_url: &str) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Extract a pretty site name from a URL without scraping.
/// Returns "Unknown Site" when the URL cannot be parsed.
pub fn extract_site_name(raw_url: &str) -> String {
    let Some(domain) = domain_of(raw_url) else {
        return "Unknown Site".to_string();
    };

    let parts: Vec<&str> = domain.split('.').collect();

    let main_label = if parts.len() >= 3 && COMMON_TLDS.contains(parts.last().unwrap_or(&"")) {
        let suffix = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        if COMPOUND_TLDS.contains(&suffix.as_str()) {
            parts[parts.len() - 3]
        } else {
            parts[parts.len() - 2]
        }
    } else {
        parts[0]
    };

    main_label
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Favicon reference for a URL, via DuckDuckGo's icon service.
pub fn favicon_url(raw_url: &str) -> Option<String> {
    let domain = domain_of(raw_url)?;
    Some(format!("https://icons.duckduckgo.com/ip3/{domain}.ico"))
}
