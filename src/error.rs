//! Error types for every layer of the scraper.
//!
//! Field-extraction misses are deliberately absent from this module: a
//! selector that matches nothing is modelled as `None`, never as an error.
//! Only the layers that can genuinely fail (parsing the document at all,
//! fetching, session handling, persistence and configuration) get an
//! error enum here.

use thiserror::Error;

/// The document handed to the extraction core could not be parsed at all.
///
/// Callers should treat the whole fetch as failed and move on to the next
/// URL variant or strategy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("document does not contain any markup ({bytes} bytes of plain text)")]
    NotMarkup { bytes: usize },
}

/// Failure of one fetch attempt (static or rendered).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("response from {url} does not look like HTML")]
    NotHtml { url: String },

    #[error("attempt for {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("{mode} fetching is not configured")]
    NotConfigured { mode: &'static str },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether another attempt at the same URL could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::NotHtml { .. }
            | FetchError::NotConfigured { .. }
            | FetchError::Client(_) => false,
        }
    }
}

/// Cookie file and authentication problems.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cookies file not found: {0}")]
    MissingFile(String),

    #[error("failed to read cookies file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse cookies file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no cookies for {0} found in cookies file")]
    NoDomainCookies(String),

    #[error("missing required cookie: {0}")]
    MissingCookie(&'static str),

    #[error("empty value for required cookie: {0}")]
    EmptyCookie(&'static str),

    #[error("c_user cookie should be numeric, got: {0}")]
    NonNumericUser(String),

    #[error("authentication failed: redirected to login page")]
    LoginRedirect,

    #[error("authentication failed: account requires checkpoint verification")]
    Checkpoint,

    #[error("authentication failed: captcha challenge required")]
    Captcha,

    #[error("authentication failed: status code {0}")]
    Status(u16),

    #[error("failed to reach verification page: {0}")]
    Network(String),
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to serialize post lists: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let rate_limited = FetchError::Status {
            url: "u".into(),
            status: 429,
        };
        let server = FetchError::Status {
            url: "u".into(),
            status: 503,
        };
        let not_found = FetchError::Status {
            url: "u".into(),
            status: 404,
        };
        assert!(rate_limited.is_retryable());
        assert!(server.is_retryable());
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn test_timeout_and_network_are_retryable() {
        assert!(FetchError::Timeout { url: "u".into(), secs: 5 }.is_retryable());
        assert!(
            FetchError::Network {
                url: "u".into(),
                message: "reset".into()
            }
            .is_retryable()
        );
        assert!(!FetchError::NotHtml { url: "u".into() }.is_retryable());
        assert!(!FetchError::NotConfigured { mode: "rendered" }.is_retryable());
    }

    #[test]
    fn test_extract_error_display() {
        let e = ExtractError::NotMarkup { bytes: 12 };
        assert_eq!(
            e.to_string(),
            "document does not contain any markup (12 bytes of plain text)"
        );
    }
}
