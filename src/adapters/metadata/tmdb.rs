//! TMDb search client. Implements MetadataPort (remote, uncached).
//!
//! Movies go to `/search/movie` (`release_date`), series to `/search/tv` (`first_air_date`).
//! The first result wins.

use crate::domain::{Category, DomainError};
use crate::ports::MetadataPort;
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_TMDB_API_URL: &str = "https://api.themoviedb.org/3";

pub struct TmdbClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
}

impl TmdbClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn search_url(&self, kind: Category) -> Option<String> {
        let path = match kind {
            Category::Movie => "search/movie",
            Category::Series => "search/tv",
            Category::Unknown => return None,
        };
        Some(format!("{}/{}", self.api_url, path))
    }

    fn first_year(response: &SearchResponse) -> Option<u16> {
        let first = response.results.first()?;
        first
            .release_date
            .as_deref()
            .or(first.first_air_date.as_deref())
            .and_then(year_from_date)
    }
}

/// `"2017-12-01"` -> `2017`. Empty or malformed dates give `None`.
pub fn year_from_date(date: &str) -> Option<u16> {
    date.split('-')
        .next()
        .filter(|y| y.len() == 4)
        .and_then(|y| y.parse().ok())
}

#[async_trait::async_trait]
impl MetadataPort for TmdbClient {
    async fn lookup_year(
        &self,
        title: &str,
        kind: Category,
        _season: Option<u16>,
    ) -> Result<Option<u16>, DomainError> {
        let Some(url) = self.search_url(kind) else {
            return Ok(None);
        };

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("query", title)])
            .send()
            .await
            .map_err(|e| DomainError::Metadata(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "TMDb returned error");
            return Err(DomainError::Metadata(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Metadata(format!("Failed to parse TMDb response: {}", e)))?;

        let year = Self::first_year(&body);
        debug!(title, kind = kind.as_str(), ?year, "TMDb lookup");
        Ok(year)
    }
}
