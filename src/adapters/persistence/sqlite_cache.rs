//! SQLite-backed metadata cache via libsql. Implements MetadataCachePort.
//!
//! Uses the same libsql backend as grammers-session to avoid duplicate SQLite symbol link errors.
//! One `metadata` table keyed by (normalized title, kind, season). Season is -1 when absent.
//! Database file: data/metadata.db

use crate::domain::{Category, DomainError};
use crate::ports::MetadataCachePort;
use libsql::{Database, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    season INTEGER NOT NULL DEFAULT -1,
    year INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (title, kind, season)
)"#;

const NO_SEASON: i64 = -1;

pub struct SqliteMetadataCache {
    db: Database,
    db_path: PathBuf,
}

impl SqliteMetadataCache {
    /// Open (or create) `metadata.db` in `base_dir` and ensure the schema exists.
    /// Sets WAL mode and synchronous=NORMAL.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::State(e.to_string()))?;
        let db_path = base.join("metadata.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(|e| DomainError::State(e.to_string()))?;
        let conn = db.connect().map_err(|e| DomainError::State(e.to_string()))?;

        // PRAGMA returns a row; execute() fails when rows come back, so drain a query.
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::State(format!("{pragma} failed: {e}")))?;
            while rows
                .next()
                .await
                .map_err(|e| DomainError::State(e.to_string()))?
                .is_some()
            {}
        }

        conn.execute(METADATA_TABLE, ())
            .await
            .map_err(|e| DomainError::State(e.to_string()))?;

        info!(path = %db_path.display(), "metadata cache opened (WAL)");
        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

/// Cache key form of a title: lowercase, single spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn season_key(season: Option<u16>) -> i64 {
    season.map(i64::from).unwrap_or(NO_SEASON)
}

#[async_trait::async_trait]
impl MetadataCachePort for SqliteMetadataCache {
    async fn get_year(
        &self,
        title: &str,
        kind: Category,
        season: Option<u16>,
    ) -> Result<Option<u16>, DomainError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DomainError::State(e.to_string()))?;
        let mut rows = conn
            .query(
                "SELECT year FROM metadata WHERE title = ?1 AND kind = ?2 AND season = ?3",
                params![normalize_title(title), kind.as_str(), season_key(season)],
            )
            .await
            .map_err(|e| DomainError::State(e.to_string()))?;
        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::State(e.to_string()))?
        else {
            return Ok(None);
        };
        let year: i64 = row.get(0).map_err(|e| DomainError::State(e.to_string()))?;
        Ok(u16::try_from(year).ok())
    }

    async fn save_year(
        &self,
        title: &str,
        kind: Category,
        season: Option<u16>,
        year: u16,
    ) -> Result<(), DomainError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DomainError::State(e.to_string()))?;
        conn.execute(
            r#"
            INSERT INTO metadata (title, kind, season, year, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (title, kind, season) DO UPDATE SET year = excluded.year, updated_at = excluded.updated_at
            "#,
            params![
                normalize_title(title),
                kind.as_str(),
                season_key(season),
                i64::from(year),
                chrono::Utc::now().timestamp()
            ],
        )
        .await
        .map_err(|e| DomainError::State(e.to_string()))?;
        debug!(title, kind = kind.as_str(), ?season, year, "metadata cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_hit_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteMetadataCache::connect(dir.path()).await.unwrap();

        assert_eq!(cache.get_year("Dune", Category::Movie, None).await.unwrap(), None);
        cache.save_year("Dune", Category::Movie, None, 2021).await.unwrap();
        assert_eq!(
            cache.get_year("  dune ", Category::Movie, None).await.unwrap(),
            Some(2021)
        );
    }

    #[tokio::test]
    async fn key_includes_kind_and_season() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteMetadataCache::connect(dir.path()).await.unwrap();

        cache.save_year("Fargo", Category::Movie, None, 1996).await.unwrap();
        cache.save_year("Fargo", Category::Series, Some(1), 2014).await.unwrap();

        assert_eq!(cache.get_year("Fargo", Category::Movie, None).await.unwrap(), Some(1996));
        assert_eq!(cache.get_year("Fargo", Category::Series, Some(1)).await.unwrap(), Some(2014));
        assert_eq!(cache.get_year("Fargo", Category::Series, Some(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_overwrites_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = SqliteMetadataCache::connect(dir.path()).await.unwrap();
            cache.save_year("Heat", Category::Movie, None, 1990).await.unwrap();
            cache.save_year("Heat", Category::Movie, None, 1995).await.unwrap();
        }
        let cache = SqliteMetadataCache::connect(dir.path()).await.unwrap();
        assert_eq!(cache.get_year("Heat", Category::Movie, None).await.unwrap(), Some(1995));
        assert!(cache.path().ends_with("metadata.db"));
    }

    #[test]
    fn titles_normalize() {
        assert_eq!(normalize_title("  The   Office "), "the office");
    }
}
