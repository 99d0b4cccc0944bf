//! Typed errors for the lunch engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Resolver and filter
//! failures are logged and surfaced as absent results rather than
//! propagated, so a partial failure never aborts a multi-entity batch;
//! these types exist for the layers that do report errors (selection,
//! cache maintenance) and for structured logging of swallowed failures.

use thiserror::Error;

/// Errors that can occur during lunch resolution operations.
#[derive(Debug, Error)]
pub enum LunchError {
    /// Network fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Content could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration problem (unknown strategy name, missing credential)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// No entity matched a selector
    #[error("no instance found: {selector}")]
    NotFound { selector: String },

    /// Tag expression could not be parsed
    #[error("tag expression error: {0}")]
    TagExpr(#[from] crate::tags::TagExprError),

    /// Cache file-system operation failed
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the network fetch step.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be sent or the connection failed
    #[error("request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Outbound request timed out
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Entity declares no URL and none was supplied by the caller
    #[error("entity has no URL")]
    MissingUrl,
}

/// Errors raised while turning fetched bytes into text.
#[derive(Debug, Error)]
pub enum ParseError {
    /// CSS selector did not compile
    #[error("invalid CSS selector `{selector}`")]
    Selector { selector: String },

    /// Selector compiled but matched no nodes
    #[error("selector `{selector}` matched nothing")]
    EmptySelection { selector: String },

    /// PDF body could not be decoded
    #[error("malformed PDF: {0}")]
    Pdf(String),

    /// OCR engine failed or produced no output
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// No `<img src>` found inside the selected markup
    #[error("image URL not found in selection")]
    NoImage,
}

/// Configuration errors; these degrade to documented fallbacks.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Resolver name not present in the resolver set
    #[error("unknown resolver: {name}")]
    UnknownResolver { name: String },

    /// Filter name not present in the filter registry
    #[error("unknown filter: {name}")]
    UnknownFilter { name: String },

    /// Third-party API credential not configured
    #[error("missing API credential: {name}")]
    MissingCredential { name: String },
}

/// Result type alias for lunch engine operations.
pub type Result<T> = std::result::Result<T, LunchError>;
