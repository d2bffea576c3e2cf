//! Local persistence: preferences JSON and the metadata cache.

pub mod preferences_json;
pub mod sqlite_cache;

pub use preferences_json::PreferencesJson;
pub use sqlite_cache::SqliteMetadataCache;
