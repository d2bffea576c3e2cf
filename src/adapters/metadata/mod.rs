//! Release-year lookup adapters (MetadataPort).

pub mod cached;
pub mod tmdb;

pub use cached::CachedMetadata;
pub use tmdb::TmdbClient;

use crate::domain::{Category, DomainError};
use crate::ports::MetadataPort;

/// Used when no TMDb key is configured: every lookup is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetadata;

#[async_trait::async_trait]
impl MetadataPort for NoopMetadata {
    async fn lookup_year(
        &self,
        _title: &str,
        _kind: Category,
        _season: Option<u16>,
    ) -> Result<Option<u16>, DomainError> {
        Ok(None)
    }
}
