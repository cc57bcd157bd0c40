mod items;
mod schema;
mod types;

pub use schema::FeedStore;
pub use types::{FeedItem, NewFeedItem, StorageError};
