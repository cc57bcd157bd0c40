use sqlx::QueryBuilder;

use super::schema::FeedStore;
use super::types::{FeedItem, NewFeedItem, StorageError};

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of items to return from any single page query (OOM protection)
const MAX_PAGE_ITEMS: i64 = 2000;

impl FeedStore {
    // ========================================================================
    // Item Queries
    // ========================================================================

    /// Get every row in the store ordered by publish time descending.
    ///
    /// Unlike the page queries this does not filter on `removed`: the
    /// result includes soft-removed rows, which is what makes auditing
    /// and [`purge_removed`](Self::purge_removed) possible.
    pub async fn get_all_items(&self) -> Result<Vec<FeedItem>, StorageError> {
        let items = sqlx::query_as::<_, FeedItem>(
            r#"
            SELECT id, publish_time, feed_source, url, domain, img, title, description,
                   content_type, publisher_id, publisher_name, publisher_logo,
                   session_displayed, removed, liked, unread
            FROM items
            ORDER BY publish_time DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Get a single item by its ID, or `None` if no such row exists.
    pub async fn get_item(&self, item_id: i64) -> Result<Option<FeedItem>, StorageError> {
        let item = sqlx::query_as::<_, FeedItem>(
            r#"
            SELECT id, publish_time, feed_source, url, domain, img, title, description,
                   content_type, publisher_id, publisher_name, publisher_logo,
                   session_displayed, removed, liked, unread
            FROM items
            WHERE id = ?
        "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Get the live item stored under `url`.
    ///
    /// Soft-removed rows are skipped. Absence is an error here, not a
    /// normal outcome: callers use this right after an insert or from a
    /// link they just displayed, so a miss means the item is gone.
    pub async fn get_item_by_url(&self, url: &str) -> Result<FeedItem, StorageError> {
        let item = sqlx::query_as::<_, FeedItem>(
            r#"
            SELECT id, publish_time, feed_source, url, domain, img, title, description,
                   content_type, publisher_id, publisher_name, publisher_logo,
                   session_displayed, removed, liked, unread
            FROM items
            WHERE url = ? AND removed = 0
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        item.ok_or_else(|| StorageError::NotFound(format!("url {url}")))
    }

    /// Get a page of items not yet shown in `session`.
    ///
    /// Returns up to `limit` live rows whose `session_displayed` differs
    /// from `session`, ordered by publish time descending. When
    /// `require_image` is set, rows with an empty `img` are skipped.
    /// `content_type` of `None` imposes no constraint.
    pub async fn get_unseen_items(
        &self,
        session: &str,
        limit: i64,
        require_image: bool,
        content_type: Option<&str>,
    ) -> Result<Vec<FeedItem>, StorageError> {
        self.unseen_page(session, None, limit, require_image, content_type)
            .await
    }

    /// Same as [`get_unseen_items`](Self::get_unseen_items), restricted
    /// to a single publisher.
    pub async fn get_unseen_items_for_publisher(
        &self,
        session: &str,
        publisher_id: &str,
        limit: i64,
        require_image: bool,
        content_type: Option<&str>,
    ) -> Result<Vec<FeedItem>, StorageError> {
        self.unseen_page(session, Some(publisher_id), limit, require_image, content_type)
            .await
    }

    /// Shared body of the page queries. Optional filters are appended as
    /// conjuncts only when active, every value bound as a parameter.
    async fn unseen_page(
        &self,
        session: &str,
        publisher_id: Option<&str>,
        limit: i64,
        require_image: bool,
        content_type: Option<&str>,
    ) -> Result<Vec<FeedItem>, StorageError> {
        let limit = limit.clamp(0, MAX_PAGE_ITEMS);
        tracing::debug!(
            limit = limit,
            require_image = require_image,
            content_type = content_type.unwrap_or("any"),
            publisher_id = publisher_id.unwrap_or(""),
            "unseen page query with limit cap"
        );

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT id, publish_time, feed_source, url, domain, img, title, description, \
             content_type, publisher_id, publisher_name, publisher_logo, \
             session_displayed, removed, liked, unread \
             FROM items WHERE session_displayed <> ",
        );
        builder.push_bind(session);
        builder.push(" AND removed = 0");

        if let Some(publisher) = publisher_id {
            builder.push(" AND publisher_id = ");
            builder.push_bind(publisher);
        }
        if require_image {
            builder.push(" AND img <> ''");
        }
        if let Some(kind) = content_type {
            builder.push(" AND content_type = ");
            builder.push_bind(kind);
        }

        builder.push(" ORDER BY publish_time DESC LIMIT ");
        builder.push_bind(limit);

        let items = builder
            .build_query_as::<FeedItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Count live unread items.
    pub async fn count_unread(&self) -> Result<i64, StorageError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM items WHERE unread = 1 AND removed = 0")
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    // ========================================================================
    // Item Mutations
    // ========================================================================

    /// Insert a new item and return its stored representation.
    ///
    /// Runs as a single transaction: the INSERT and the read-back SELECT
    /// are never interleaved with another writer. The returned record
    /// carries the DB-assigned `id` and schema defaults
    /// (`session_displayed = ""`, `removed = false`, `liked = false`,
    /// `unread = true`).
    ///
    /// # Errors
    ///
    /// [`StorageError::InsertFailed`] if the INSERT created no row.
    /// [`StorageError::MissingAfterWrite`] if the read-back finds
    /// nothing, which cannot happen under correct SQLite semantics.
    pub async fn insert_item(&self, item: NewFeedItem) -> Result<FeedItem, StorageError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO items (publish_time, feed_source, url, domain, img, title,
                               description, content_type, publisher_id, publisher_name,
                               publisher_logo, session_displayed, removed, liked)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '', 0, 0)
        "#,
        )
        .bind(item.publish_time)
        .bind(&item.feed_source)
        .bind(&item.url)
        .bind(&item.domain)
        .bind(&item.img)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.content_type)
        .bind(&item.publisher_id)
        .bind(&item.publisher_name)
        .bind(&item.publisher_logo)
        .execute(&mut *tx)
        .await?;

        let new_id = result.last_insert_rowid();
        if result.rows_affected() == 0 || new_id == 0 {
            return Err(StorageError::InsertFailed);
        }

        let stored = sqlx::query_as::<_, FeedItem>(
            r#"
            SELECT id, publish_time, feed_source, url, domain, img, title, description,
                   content_type, publisher_id, publisher_name, publisher_logo,
                   session_displayed, removed, liked, unread
            FROM items
            WHERE id = ?
        "#,
        )
        .bind(new_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::MissingAfterWrite)?;

        tx.commit().await?;
        Ok(stored)
    }

    /// Record that an item was shown in `session`, returning the updated row.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if no row has this id.
    pub async fn mark_item_displayed(
        &self,
        item_id: i64,
        session: &str,
    ) -> Result<FeedItem, StorageError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE items SET session_displayed = ? WHERE id = ?")
            .bind(session)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("id {item_id}")));
        }

        let item = sqlx::query_as::<_, FeedItem>(
            r#"
            SELECT id, publish_time, feed_source, url, domain, img, title, description,
                   content_type, publisher_id, publisher_name, publisher_logo,
                   session_displayed, removed, liked, unread
            FROM items
            WHERE id = ?
        "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::MissingAfterWrite)?;

        tx.commit().await?;
        Ok(item)
    }

    /// Record that a batch of items was shown in `session` using one
    /// UPDATE statement, returning the updated rows.
    ///
    /// An empty `ids` slice is a no-op and returns an empty vec. Ids
    /// with no matching row are skipped; the call fails with
    /// [`StorageError::NotFound`] only when nothing matched at all.
    pub async fn mark_items_displayed(
        &self,
        ids: &[i64],
        session: &str,
    ) -> Result<Vec<FeedItem>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        let mut update: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("UPDATE items SET session_displayed = ");
        update.push_bind(session);
        update.push(" WHERE id IN (");
        let mut separated = update.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let affected = update.build().execute(&mut *tx).await?.rows_affected();
        if affected == 0 {
            return Err(StorageError::NotFound(format!("any of {} ids", ids.len())));
        }

        let mut select: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT id, publish_time, feed_source, url, domain, img, title, description, \
             content_type, publisher_id, publisher_name, publisher_logo, \
             session_displayed, removed, liked, unread \
             FROM items WHERE id IN (",
        );
        let mut separated = select.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY publish_time DESC");

        let items = select
            .build_query_as::<FeedItem>()
            .fetch_all(&mut *tx)
            .await?;
        if items.is_empty() {
            return Err(StorageError::MissingAfterWrite);
        }

        tx.commit().await?;
        Ok(items)
    }

    /// Set the read state of an item, returning the updated row.
    ///
    /// The stored flag is `unread`, so `read = true` stores
    /// `unread = false` and vice versa.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if no row has this id.
    pub async fn set_item_read(&self, item_id: i64, read: bool) -> Result<FeedItem, StorageError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE items SET unread = ? WHERE id = ?")
            .bind(!read)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("id {item_id}")));
        }

        let item = sqlx::query_as::<_, FeedItem>(
            r#"
            SELECT id, publish_time, feed_source, url, domain, img, title, description,
                   content_type, publisher_id, publisher_name, publisher_logo,
                   session_displayed, removed, liked, unread
            FROM items
            WHERE id = ?
        "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::MissingAfterWrite)?;

        tx.commit().await?;
        Ok(item)
    }

    /// Soft-delete an item, returning whether a row was marked.
    ///
    /// The row stays in the table with `removed = 1` and disappears from
    /// the filtered read paths. Marking a missing or already-removed id
    /// is not an error.
    pub async fn remove_item(&self, item_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE items SET removed = 1 WHERE id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete every item from one publisher, returning the number
    /// of rows marked.
    pub async fn remove_publisher_items(&self, publisher_id: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("UPDATE items SET removed = 1 WHERE publisher_id = ?")
            .bind(publisher_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Hard-delete an item by id, returning whether a row was deleted.
    ///
    /// Deleting a missing id succeeds with `false` (idempotent).
    pub async fn delete_item(&self, item_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every row in the store. Irreversible.
    pub async fn delete_all_items(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM items").execute(&self.pool).await?;
        tracing::debug!(deleted = result.rows_affected(), "deleted all items");
        Ok(result.rows_affected())
    }

    /// Hard-delete every soft-removed row, returning the number purged.
    pub async fn purge_removed(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM items WHERE removed = 1")
            .execute(&self.pool)
            .await?;
        tracing::debug!(purged = result.rows_affected(), "purged removed items");
        Ok(result.rows_affected())
    }
}
