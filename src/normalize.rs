use sha2::Digest as _;

/// Canonical form used for seen-set keys and item URLs.
///
/// Trims whitespace, drops the fragment and removes the trailing `/`. Query
/// strings are kept: sitemaps often list paginated or filtered pages that
/// differ only by query. Applying it twice changes nothing.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    without_fragment
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_owned()
}

/// Lowercase hex SHA-256 of `normalized`, hashed exactly as given so the
/// seen-set key is always the hash of the stored value.
pub fn url_hash(normalized: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}
