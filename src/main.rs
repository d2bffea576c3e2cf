//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here; authentication is delegated to AuthService.

use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tg_relay::adapters::classify::TitleParser;
use tg_relay::adapters::metadata::{CachedMetadata, NoopMetadata, TmdbClient};
use tg_relay::adapters::persistence::{PreferencesJson, SqliteMetadataCache};
use tg_relay::adapters::telegram::{GrammersAuthAdapter, GrammersTgGateway, session};
use tg_relay::adapters::ui::tui::{JobDefaults, TuiInputPort};
use tg_relay::ports::{
    AuthPort, ClassifierPort, InputPort, MetadataCachePort, MetadataPort, PreferencesPort,
    TgGateway,
};
use tg_relay::shared::config::AppConfig;
use tg_relay::usecases::{AuthService, ForwardService, JobDeps, JobRegistry};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    tg_relay::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config could not be loaded, using defaults");
        AppConfig::default()
    });
    let api_hash = cfg.api_hash.clone().unwrap_or_default();
    if api_hash.is_empty() {
        anyhow::bail!("Set TG_RELAY_API_HASH (env or .env). Get from https://my.telegram.org");
    }

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    tokio::fs::create_dir_all(&data_path)
        .await
        .map_err(|e| anyhow::anyhow!("create data dir: {}", e))?;
    info!(path = %data_path.display(), "data directory");
    let session_path = cfg
        .session_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_path.join("session.db"));

    // --- Telegram client (cloned for auth and gateway; same session) ---
    let tg_client = session::connect(&session_path, cfg.api_id.unwrap_or(0)).await?;
    let tg: Arc<dyn TgGateway> = Arc::new(GrammersTgGateway::new(tg_client.clone()));

    // --- Metadata: SQLite cache in front of TMDb, or nothing without a key ---
    let metadata: Arc<dyn MetadataPort> = match cfg.tmdb_api_key() {
        Some(key) => {
            let cache: Arc<dyn MetadataCachePort> = Arc::new(
                SqliteMetadataCache::connect(&data_path)
                    .await
                    .map_err(|e| anyhow::anyhow!("metadata cache: {}", e))?,
            );
            let remote: Arc<dyn MetadataPort> =
                Arc::new(TmdbClient::new(cfg.tmdb_api_url_or_default(), key));
            info!("caption enrichment: TMDb lookups enabled");
            Arc::new(CachedMetadata::new(cache, remote))
        }
        None => {
            warn!("TMDB_API_KEY not set, enriched captions will not look up years");
            Arc::new(NoopMetadata)
        }
    };

    let prefs_impl = PreferencesJson::new(data_path.join("preferences.json"));
    prefs_impl
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let preferences: Arc<dyn PreferencesPort> = Arc::new(prefs_impl);

    // --- Services ---
    let classifier: Arc<dyn ClassifierPort> = Arc::new(TitleParser::new());
    let deps = JobDeps {
        tg: Arc::clone(&tg),
        classifier,
        metadata,
    };
    let admins = cfg.admin_ids();
    if !admins.is_empty() {
        info!(count = admins.len(), "job admission restricted to admins");
    }
    let forward = Arc::new(ForwardService::new(deps, JobRegistry::new(), admins));

    let defaults = JobDefaults {
        delay_secs: cfg.delay_secs_or_default(),
        forward_cap: cfg.forward_cap(),
        caption_template: cfg.caption_template.clone(),
    };
    let tui = Arc::new(TuiInputPort::new(
        Arc::clone(&tg),
        Arc::clone(&forward),
        preferences,
        defaults,
    ));

    // --- Auth: adapter + service, prompts from the TUI ---
    let auth_adapter: Arc<dyn AuthPort> = Arc::new(GrammersAuthAdapter::new(tg_client));
    let auth_service = AuthService::new(auth_adapter, api_hash);
    auth_service
        .run_auth_flow(tui.as_ref())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let input_port: Arc<dyn InputPort> = tui;
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
