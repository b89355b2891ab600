use crate::config::Config;
use crate::ffmpeg::Encoder;
use anyhow::Result;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "studio.json";

/// Loads `.env` (if present) and then the JSON config with env overrides.
pub async fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            tracing::warn!("Ignoring unreadable .env: {}", err);
        }
    }
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    Config::load(path).await
}

pub async fn check_ffmpeg(cfg: &Config) -> bool {
    Encoder::from_config(cfg).check().await.is_ok()
}
