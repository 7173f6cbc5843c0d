//! Error types for loading, configuration and report output.

use std::path::PathBuf;

/// Result type for loading a period's sources
pub type LoadResult<T> = Result<T, DataSourceError>;

/// Failure to read one of a period's input tables.
///
/// Any of these is fatal for the period it belongs to and for nothing else.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("source not found: {} ({source_name})", .path.display())]
    SourceNotFound { source_name: String, path: PathBuf },

    #[error("{source_name}: missing required column '{column}'")]
    SchemaMismatch { source_name: String, column: String },

    #[error("{source_name}: malformed data at line {line}: {message}")]
    Malformed {
        source_name: String,
        line: u64,
        message: String,
    },

    #[error("{source_name}: I/O error: {message}")]
    Io { source_name: String, message: String },
}

impl DataSourceError {
    /// Short machine-readable tag for run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            DataSourceError::SourceNotFound { .. } => "source_not_found",
            DataSourceError::SchemaMismatch { .. } => "schema_mismatch",
            DataSourceError::Malformed { .. } => "malformed",
            DataSourceError::Io { .. } => "io",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let missing = DataSourceError::SourceNotFound {
            source_name: "bookings".into(),
            path: PathBuf::from("bookings_03-2025.csv"),
        };
        let schema = DataSourceError::SchemaMismatch {
            source_name: "bookings".into(),
            column: "BookingDate".into(),
        };
        assert_eq!(missing.kind(), "source_not_found");
        assert_eq!(schema.kind(), "schema_mismatch");
        assert!(schema.to_string().contains("BookingDate"));
    }
}
