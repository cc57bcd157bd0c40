//! Embedded storage for a news-feed timeline.
//!
//! A single SQLite table of feed items with typed records in and out:
//! insert with transactional read-back, session-aware page queries with
//! optional filters, read-state toggling, soft delete, and hard delete.
//!
//! # Examples
//!
//! ```no_run
//! use feedstore::{FeedStore, NewFeedItem};
//!
//! # async fn example() -> Result<(), feedstore::StorageError> {
//! let store = FeedStore::open("feedstore.db").await?;
//!
//! let item = store
//!     .insert_item(NewFeedItem {
//!         publish_time: 1_700_000_000_000,
//!         feed_source: "top-stories".into(),
//!         url: "https://example.com/post".into(),
//!         domain: "example.com".into(),
//!         img: "https://example.com/post.jpg".into(),
//!         title: "A headline".into(),
//!         description: "Summary text".into(),
//!         content_type: "article".into(),
//!         publisher_id: "pub-1".into(),
//!         publisher_name: "Example News".into(),
//!         publisher_logo: "https://example.com/logo.png".into(),
//!     })
//!     .await?;
//!
//! // Items already shown in session "s1" are skipped.
//! let page = store.get_unseen_items("s1", 20, false, None).await?;
//! store.mark_item_displayed(item.id, "s1").await?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod storage;

pub use config::{ConfigError, StoreConfig};
pub use storage::{FeedItem, FeedStore, NewFeedItem, StorageError};
