//! Error types for table exports

use std::fmt;
use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for all export operations
#[derive(Error, Debug)]
pub enum ExportError {
    /// Invalid combination of options, surfaced before any row is written
    #[error("Invalid export configuration: {0}")]
    Configuration(String),

    /// The table source could not produce a value
    #[error("Failed to read column '{column}' of item {item} for sheet '{sheet}': {source}")]
    SourceAccess {
        sheet: String,
        column: String,
        item: String,
        #[source]
        source: SourceError,
    },

    /// The output container could not be written
    #[error("Failed to serialize export: {0}")]
    Serialization(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error wrapper
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Error returned by a [`TableSource`](crate::source::TableSource) when it
/// cannot produce a value for an item/column pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        SourceError {
            message: message.into(),
        }
    }

    /// The item id is unknown to the source
    pub fn unknown_item(item: impl fmt::Debug) -> Self {
        SourceError::new(format!("unknown item {:?}", item))
    }

    /// The column id is unknown to the source
    pub fn unknown_column(column: &str) -> Self {
        SourceError::new(format!("unknown column '{}'", column))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SourceError {}

/// A format pattern could not be applied to a value.
///
/// Never escapes the formatting layer: the resolver absorbs it and falls back
/// to the value's natural text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("pattern '{0}' has no digit placeholder")]
    NoDigitPlaceholder(String),

    #[error("pattern '{0}' has no date or time field")]
    NoDateField(String),

    #[error("pattern '{pattern}' cannot format a {kind} value")]
    Mismatch { pattern: String, kind: &'static str },

    #[error("pattern '{0}' could not be rendered")]
    Render(String),
}

impl ExportError {
    /// Report an output failure as a serialization error under `context`
    ///
    /// Source and configuration errors pass through unchanged.
    pub(crate) fn while_writing(self, context: &str) -> Self {
        match self {
            ExportError::Io(err) => ExportError::Serialization(format!("{}: {}", context, err)),
            ExportError::Csv(err) => ExportError::Serialization(format!("{}: {}", context, err)),
            ExportError::Serialization(msg) => {
                ExportError::Serialization(format!("{}: {}", context, msg))
            }
            other => other,
        }
    }
}

impl<W> From<csv::IntoInnerError<W>> for ExportError {
    fn from(err: csv::IntoInnerError<W>) -> Self {
        ExportError::Serialization(err.error().to_string())
    }
}
