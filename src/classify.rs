use url::Url;

use crate::model::UrlType;

/// Coarse page type from the URL path alone.
pub fn classify_url(url: &str) -> UrlType {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return UrlType::Unknown;
    };
    let path = parsed.path();

    if path.is_empty() || path == "/" {
        UrlType::Home
    } else if path.starts_with("/c/") || path.contains("/category/") {
        UrlType::Category
    } else if path.starts_with("/t/") || path.contains("/tag/") {
        UrlType::Tag
    } else {
        UrlType::Game
    }
}

/// Human keyword guessed from the last path segment (`super-cool_game` -> `super cool game`).
pub fn extract_keyword(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return String::new();
    };
    let Some(segment) = parsed
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
    else {
        return String::new();
    };

    segment
        .replace(['-', '_'], " ")
        .to_lowercase()
        .trim()
        .to_owned()
}
