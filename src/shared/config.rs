//! Application configuration. API credentials, paths, job defaults.
//!
//! Loaded from `TG_RELAY_*` environment variables (after `.env`) and an optional file
//! named by `TG_RELAY_CONFIG`.

use serde::Deserialize;

/// Seconds between successful sends when nothing else is configured.
pub const DEFAULT_DELAY_SECS: u64 = 1;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub data_dir: Option<String>,
    pub session_path: Option<String>,

    /// Pacing between sends. Read from TG_RELAY_DELAY_SECS.
    #[serde(default)]
    pub delay_secs: Option<u64>,

    /// Default forward cap; unset means unbounded. Read from TG_RELAY_FORWARD_CAP.
    #[serde(default)]
    pub forward_cap: Option<u64>,

    /// Default caption template. Read from TG_RELAY_CAPTION_TEMPLATE.
    #[serde(default)]
    pub caption_template: Option<String>,

    /// TMDb key for caption enrichment. Read from TG_RELAY_TMDB_API_KEY or TMDB_API_KEY.
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    #[serde(default)]
    pub tmdb_api_url: Option<String>,

    /// Comma-separated account ids allowed to run jobs. Read from TG_RELAY_ADMINS.
    #[serde(default)]
    pub admins: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("TG_RELAY"));
        if let Ok(path) = std::env::var("TG_RELAY_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> &str {
        self.data_dir.as_deref().unwrap_or("./data")
    }

    pub fn delay_secs_or_default(&self) -> u64 {
        self.delay_secs.unwrap_or(DEFAULT_DELAY_SECS)
    }

    /// `Some(0)` counts as unbounded.
    pub fn forward_cap(&self) -> Option<u64> {
        self.forward_cap.filter(|c| *c > 0)
    }

    pub fn tmdb_api_key(&self) -> Option<String> {
        self.tmdb_api_key
            .clone()
            .or_else(|| std::env::var("TMDB_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn tmdb_api_url_or_default(&self) -> String {
        self.tmdb_api_url
            .clone()
            .unwrap_or_else(|| crate::adapters::metadata::tmdb::DEFAULT_TMDB_API_URL.to_string())
    }

    /// Parsed admin ids. Unparseable entries are dropped.
    pub fn admin_ids(&self) -> Vec<i64> {
        self.admins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_list_parsing() {
        let cfg = AppConfig {
            admins: Some(" 12, abc,-34 ,,".into()),
            ..AppConfig::default()
        };
        assert_eq!(cfg.admin_ids(), vec![12, -34]);
        assert!(AppConfig::default().admin_ids().is_empty());
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig {
            forward_cap: Some(0),
            ..AppConfig::default()
        };
        assert_eq!(cfg.forward_cap(), None);
        assert_eq!(cfg.delay_secs_or_default(), DEFAULT_DELAY_SECS);
        assert_eq!(cfg.data_dir_or_default(), "./data");
        assert_eq!(
            cfg.tmdb_api_url_or_default(),
            "https://api.themoviedb.org/3"
        );
    }
}
