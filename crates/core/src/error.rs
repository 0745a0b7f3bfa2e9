// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when opening a JSONL transcript
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Session file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors that can occur when reading or writing session index files
#[derive(Debug, Error)]
pub enum SessionIndexError {
    #[error("Session index file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading session index: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error on session index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in session index {path}: {message}")]
    MalformedJson { path: PathBuf, message: String },

    #[error("Failed to serialize session index {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionIndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether this error means "there is no index", which every caller treats
    /// as an empty index rather than a failure.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors surfaced by repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Cannot read session directory {path}: {source}")]
    NotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error(transparent)]
    Index(#[from] SessionIndexError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Session {session_id} has no entry in {path}")]
    NotIndexed { session_id: String, path: PathBuf },

    #[error("Refusing to overwrite existing transcript: {path}")]
    DestinationExists { path: PathBuf },

    #[error("{source} (rollback complete: {rolled_back})")]
    PartialMove {
        #[source]
        source: Box<RepositoryError>,
        rolled_back: bool,
    },
}

impl RepositoryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn not_readable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::NotReadable {
            path: path.into(),
            source,
        }
    }

    /// True when the referenced session is simply gone. Callers treat this as
    /// a benign no-op.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::PartialMove { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::not_found("/path/to/file.jsonl");
        assert!(err.to_string().contains("/path/to/file.jsonl"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_parse_error_io_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ParseError::io("/test/path", io_err);
        assert!(matches!(err, ParseError::NotFound { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = ParseError::io("/test/path", io_err);
        assert!(matches!(err, ParseError::PermissionDenied { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
        let err = ParseError::io("/test/path", io_err);
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn test_index_error_absent() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = SessionIndexError::io("/p/sessions-index.json", io_err);
        assert!(err.is_absent());

        let err = SessionIndexError::MalformedJson {
            path: PathBuf::from("/p/sessions-index.json"),
            message: "expected value".into(),
        };
        assert!(!err.is_absent());
    }

    #[test]
    fn test_partial_move_display_mentions_rollback() {
        let inner = RepositoryError::Index(SessionIndexError::MalformedJson {
            path: PathBuf::from("/p/sessions-index.json"),
            message: "trailing comma".into(),
        });
        let err = RepositoryError::PartialMove {
            source: Box::new(inner),
            rolled_back: true,
        };
        let text = err.to_string();
        assert!(text.contains("trailing comma"));
        assert!(text.contains("rollback complete: true"));
    }

    #[test]
    fn test_repository_not_found_is_benign() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = RepositoryError::io("/p/abc.jsonl", io_err);
        assert!(err.is_not_found());

        let wrapped = RepositoryError::PartialMove {
            source: Box::new(err),
            rolled_back: false,
        };
        assert!(wrapped.is_not_found());
    }
}
