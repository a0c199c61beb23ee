use thiserror::Error;

/// Transport-level failure of a single outbound request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request failed: {url}: {message}")]
    Request { url: String, message: String },
}

/// The document could not be read as a sitemap.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Type: sitemapindex")]
    SitemapIndex,

    #[error("Unknown XML structure")]
    UnknownStructure,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0}")]
    Precondition(&'static str),

    #[error("{0}")]
    Network(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("store: {0:#}")]
    Store(anyhow::Error),
}

impl From<FetchError> for ScanError {
    fn from(err: FetchError) -> Self {
        Self::Network(err.to_string())
    }
}

impl ScanError {
    pub fn http_status(status: u16) -> Self {
        Self::Network(format!("HTTP {status}"))
    }
}
