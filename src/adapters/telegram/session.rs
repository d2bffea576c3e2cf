//! Session storage and client bootstrap.
//!
//! The grammers SqliteSession file keeps the authorization across restarts.

use grammers_session::storages::SqliteSession;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Open (or create) the session file, creating parent directories as needed.
pub async fn open_file_session(path: impl AsRef<Path>) -> anyhow::Result<SqliteSession> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("create session directory: {}", e))?;
    }
    SqliteSession::open(path)
        .await
        .map_err(|e| anyhow::anyhow!("open session file: {}", e))
}

/// Build a client on top of the session file. The sender pool runs on its own task.
pub async fn connect(session_path: &Path, api_id: i32) -> anyhow::Result<grammers_client::Client> {
    if api_id == 0 {
        anyhow::bail!("Set TG_RELAY_API_ID (and TG_RELAY_API_HASH). Get them from https://my.telegram.org");
    }
    let session = Arc::new(open_file_session(session_path).await?);
    let pool = grammers_client::SenderPool::new(session, api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    info!(path = %session_path.display(), "telegram client ready");
    Ok(grammers_client::Client::new(handle))
}
