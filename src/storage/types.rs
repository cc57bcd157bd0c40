use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors with user-facing messages.
///
/// Every operation on [`FeedStore`] fails with this type; database-engine
/// failures pass through as [`StorageError::Db`] with the engine's message.
///
/// [`FeedStore`]: super::FeedStore
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another process has the database locked
    #[error("Another process appears to have the feed store locked. Please close it and try again.")]
    Locked,

    /// Migration failed
    #[error("Feed store migration failed: {0}")]
    Migration(String),

    /// An insert reported success but created no row
    #[error("Insert did not create a new row")]
    InsertFailed,

    /// A read path that requires an existing row found none
    #[error("No matching item for {0}")]
    NotFound(String),

    /// A row written moments ago inside the same transaction is gone
    #[error("Item row missing after write")]
    MissingAfterWrite,

    /// Generic database error
    #[error("Feed store error: {0}")]
    Db(#[from] sqlx::Error),
}

impl StorageError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StorageError::Locked;
        }

        StorageError::Db(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A feed item as stored in the `items` table.
///
/// `liked` is owned by the preferences component; this store reads it
/// back but never mutates it. `unread` is stored inverted relative to
/// the `read` argument of [`set_item_read`].
///
/// [`set_item_read`]: super::FeedStore::set_item_read
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedItem {
    pub id: i64,
    /// Publication timestamp in milliseconds since the epoch.
    pub publish_time: i64,
    pub feed_source: String,
    pub url: String,
    pub domain: String,
    /// Image URL; empty string means the item has no image.
    pub img: String,
    pub title: String,
    pub description: String,
    pub content_type: String,
    pub publisher_id: String,
    pub publisher_name: String,
    pub publisher_logo: String,
    /// Last session this item was shown in; empty string means never shown.
    pub session_displayed: String,
    /// Soft-delete flag. Removed rows stay in the table but are excluded
    /// from the filtered read paths.
    pub removed: bool,
    pub liked: bool,
    pub unread: bool,
}

impl FeedItem {
    /// The publication time as a UTC datetime.
    ///
    /// Returns `None` for timestamps outside chrono's representable range.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.publish_time).single()
    }
}

/// Caller-supplied fields for inserting a new feed item.
///
/// The store fills in the rest: a fresh `id`, `session_displayed = ""`,
/// `removed = false`, `liked = false`, and the schema default for
/// `unread`.
#[derive(Debug, Clone)]
pub struct NewFeedItem {
    pub publish_time: i64,
    pub feed_source: String,
    pub url: String,
    pub domain: String,
    pub img: String,
    pub title: String,
    pub description: String,
    pub content_type: String,
    pub publisher_id: String,
    pub publisher_name: String,
    pub publisher_logo: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_at_converts_millis() {
        let item = FeedItem {
            id: 1,
            publish_time: 1_700_000_000_000,
            feed_source: String::new(),
            url: String::new(),
            domain: String::new(),
            img: String::new(),
            title: String::new(),
            description: String::new(),
            content_type: String::new(),
            publisher_id: String::new(),
            publisher_name: String::new(),
            publisher_logo: String::new(),
            session_displayed: String::new(),
            removed: false,
            liked: false,
            unread: true,
        };

        let at = item.published_at().unwrap();
        assert_eq!(at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_from_sqlx_classifies_lock_errors() {
        let err = sqlx::Error::Protocol("database is locked".to_string());
        assert!(matches!(StorageError::from_sqlx(err), StorageError::Locked));

        let err = sqlx::Error::RowNotFound;
        assert!(matches!(StorageError::from_sqlx(err), StorageError::Db(_)));
    }
}
