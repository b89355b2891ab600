use crate::api::snippet;
use crate::config::Config;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Value, json};

fn image_url(resp: &Value) -> Option<String> {
    resp.pointer("/data/0/url")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Grok image generation. The endpoint has no size presets, so the
/// normalizer's pad step takes care of the aspect ratio.
pub async fn xai_generate_image(client: &Client, cfg: &Config, prompt: &str) -> Result<String> {
    let url = format!(
        "{}/v1/images/generations",
        cfg.xai_base_url.trim_end_matches('/')
    );
    let body = json!({
        "model": cfg.xai_image_model,
        "prompt": prompt,
        "n": 1,
        "response_format": "url",
    });

    let resp = client
        .post(url)
        .bearer_auth(&cfg.xai_api_key)
        .json(&body)
        .timeout(cfg.http_timeout())
        .send()
        .await
        .context("xAI image request failed")?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("xAI image HTTP {}: {}", status.as_u16(), snippet(&raw));
    }
    let value: Value = serde_json::from_str(&raw).context("xAI image response was not JSON")?;
    image_url(&value).with_context(|| format!("no image URL in xAI response: {}", snippet(&raw)))
}
