//! Centralized error types for Tessera.

use thiserror::Error;

/// Main error type for widget engine operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// The widget or its data source is misconfigured. Surfaced inline for
    /// the affected widget; its pipeline halts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Fetching remote data failed. The pipeline degrades to null data.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Widget not found: {0}")]
    WidgetNotFound(i64),

    #[error("Widget store error: {0}")]
    Store(String),

    /// Producing the variant payload failed. Replaced by a raw JSON view.
    #[error("Render error: {0}")]
    Render(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

/// Result type for widget engine operations.
pub type TesseraResult<T> = Result<T, TesseraError>;

impl TesseraError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a render error.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Whether this error must halt the widget's pipeline.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
