//! Catalog error taxonomy.
//!
//! Every fallible catalog operation reports one of these variants. Callers
//! that walk many files (scans, syncs, the watcher) log the error and move on
//! to the next file; only the watcher's own OS-level failure is fatal, and it
//! never surfaces through this type.

/// Common error type for starfin.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lookup matched nothing (path not in the catalog, no TMDB match).
    #[error("Not found: {0}")]
    NotFound(String),

    /// An external collaborator (metadata provider, probe, scraper) failed.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// The mutation would create a duplicate.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested mutation does not fit the current catalog state.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Unavailable error.
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a new Conflict error.
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new Invariant error.
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        Self::Invariant(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means "nothing matched" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/media/film.mkv");
        assert_eq!(err.to_string(), "Not found: /media/film.mkv");

        let err = Error::unavailable("tmdb timed out");
        assert_eq!(err.to_string(), "Unavailable: tmdb timed out");

        let err = Error::conflict("subtitle already attached");
        assert_eq!(err.to_string(), "Conflict: subtitle already attached");

        let err = Error::invariant("no volume file at /a.mkv");
        assert_eq!(err.to_string(), "Invariant violation: no volume file at /a.mkv");

        let err = Error::database("connection failed");
        assert_eq!(err.to_string(), "Database error: connection failed");

        let err = Error::invalid_input("bad format");
        assert_eq!(err.to_string(), "Invalid input: bad format");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::not_found("x").is_not_found());
        assert!(!Error::conflict("x").is_not_found());
    }
}
