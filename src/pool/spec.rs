use std::fmt;

use rusqlite::OpenFlags;

use crate::error::SqliteOrmError;

/// Identifies a database and how to open it. Connections are pooled per [`ConnectionSpec::key`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    path: String,
    flags: OpenFlags,
    has_flags: bool,
    key: String,
}

impl ConnectionSpec {
    /// Open `path` read/write, creating it if missing, with rusqlite's default flags.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self::build(
            path.into(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            false,
        )
    }

    /// Open `path` with exactly `flags`.
    #[must_use]
    pub fn with_flags(path: impl Into<String>, flags: OpenFlags) -> Self {
        Self::build(path.into(), flags, true)
    }

    /// Spec for connections shared with the async facade: adds `FULL_MUTEX`.
    #[must_use]
    pub fn for_async(path: impl Into<String>) -> Self {
        Self::with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
    }

    fn build(path: String, flags: OpenFlags, has_flags: bool) -> Self {
        let key = format!("{}|{}|{}", flags.bits(), has_flags, path);
        Self {
            path,
            flags,
            has_flags,
            key,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    #[must_use]
    pub fn has_flags(&self) -> bool {
        self.has_flags
    }

    /// `"<flag bits>|<has_flags>|<path>"`
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Open a new native connection for this spec.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::ConnectionError` if the database cannot be opened.
    pub(crate) fn open(&self) -> Result<rusqlite::Connection, SqliteOrmError> {
        let opened = if self.has_flags {
            rusqlite::Connection::open_with_flags(&self.path, self.flags)
        } else {
            rusqlite::Connection::open(&self.path)
        };
        opened.map_err(|e| {
            SqliteOrmError::ConnectionError(format!("failed to open {}: {e}", self.path))
        })
    }
}

impl fmt::Debug for ConnectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSpec").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_distinguishes_flags() {
        let plain = ConnectionSpec::new("a.db");
        let asynchronous = ConnectionSpec::for_async("a.db");
        assert_ne!(plain.key(), asynchronous.key());
        assert!(plain.key().ends_with("|false|a.db"));
        assert!(asynchronous.has_flags());
        assert!(asynchronous.flags().contains(OpenFlags::SQLITE_OPEN_FULL_MUTEX));
        assert_eq!(plain, ConnectionSpec::new("a.db"));
    }
}
