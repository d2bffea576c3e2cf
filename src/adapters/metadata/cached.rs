//! Cache-first year lookup: local cache, then the remote source, then store.

use crate::domain::{Category, DomainError};
use crate::ports::{MetadataCachePort, MetadataPort};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CachedMetadata {
    cache: Arc<dyn MetadataCachePort>,
    remote: Arc<dyn MetadataPort>,
}

impl CachedMetadata {
    pub fn new(cache: Arc<dyn MetadataCachePort>, remote: Arc<dyn MetadataPort>) -> Self {
        Self { cache, remote }
    }
}

#[async_trait::async_trait]
impl MetadataPort for CachedMetadata {
    async fn lookup_year(
        &self,
        title: &str,
        kind: Category,
        season: Option<u16>,
    ) -> Result<Option<u16>, DomainError> {
        match self.cache.get_year(title, kind, season).await {
            Ok(Some(year)) => {
                debug!(title, year, "metadata cache hit");
                return Ok(Some(year));
            }
            Ok(None) => {}
            Err(e) => warn!(title, error = %e, "metadata cache read failed"),
        }

        let year = self.remote.lookup_year(title, kind, season).await?;
        if let Some(y) = year {
            if let Err(e) = self.cache.save_year(title, kind, season, y).await {
                warn!(title, error = %e, "metadata cache write failed");
            }
        }
        Ok(year)
    }
}
