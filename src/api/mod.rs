pub mod fal;
pub mod openai;
pub mod xai;

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Plain GET of a generated result URL into `dest`.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<()> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("download request failed: {}", url))?;

    if !resp.status().is_success() {
        anyhow::bail!("download HTTP {} for {}", resp.status().as_u16(), url);
    }

    let bytes = resp.bytes().await.context("download body read failed")?;
    if bytes.is_empty() {
        anyhow::bail!("download returned an empty body: {}", url);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(())
}

pub(crate) fn snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}
