use std::path::PathBuf;

/// Errors raised while building or publishing a coverage report.
///
/// Library code returns this type; the binary converts to `anyhow::Error`
/// at the boundary and uses [`ReporterError::exit_code`] for the process status.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    /// Coverage file missing, unreadable or not in the Istanbul shape.
    #[error("failed to parse coverage {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// Prior build metadata or artifact could not be retrieved.
    #[error("build history lookup failed: {0}")]
    HistoryLookup(String),

    /// Posting a comment or status to the hosting platform failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Invalid or contradictory configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem I/O failure outside of coverage parsing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ReporterError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit status for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Toml(_) => 2,
            Self::Parse { .. } => 3,
            Self::Publish(_) => 4,
            Self::HistoryLookup(_) | Self::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReporterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_shows_path() {
        let err = ReporterError::parse("/tmp/coverage-final.json", "expected an object");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/coverage-final.json"));
        assert!(msg.contains("expected an object"));
    }

    #[test]
    fn test_exit_codes_are_distinct_and_non_zero() {
        let codes = [
            ReporterError::Config("x".into()).exit_code(),
            ReporterError::parse("a", "b").exit_code(),
            ReporterError::Publish("x".into()).exit_code(),
        ];
        assert_eq!(codes, [2, 3, 4]);
        assert_ne!(ReporterError::HistoryLookup("x".into()).exit_code(), 0);
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ReporterError = io_err.into();
        assert!(err.to_string().contains("gone"));
        assert_eq!(err.exit_code(), 1);
    }
}
