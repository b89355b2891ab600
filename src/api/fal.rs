use crate::api::snippet;
use crate::config::{AspectRatio, Config};
use crate::logi;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;

pub const SCENE_IMAGE_MODEL: &str = "fal-ai/recraft-v3";
pub const SEED_IMAGE_MODEL: &str = "fal-ai/flux-pro";
pub const IMAGE_TO_VIDEO_MODEL: &str = "fal-ai/kling-video/v1/standard/image-to-video";
pub const MUSIC_MODEL: &str = "fal-ai/stable-audio";

/// Handle returned by the queue on submission.
#[derive(Debug, Deserialize)]
struct QueueHandle {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
}

fn key_header(cfg: &Config) -> String {
    format!("Key {}", cfg.fal_api_key)
}

async fn get_json(client: &Client, cfg: &Config, url: &str) -> Result<Value> {
    let resp = client
        .get(url)
        .header("Authorization", key_header(cfg))
        .timeout(cfg.http_timeout())
        .send()
        .await
        .with_context(|| format!("fal request failed: {}", url))?;
    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("fal HTTP {} for {}: {}", status.as_u16(), url, snippet(&raw));
    }
    serde_json::from_str(&raw).with_context(|| format!("fal returned invalid JSON: {}", snippet(&raw)))
}

/// Submits a job to the fal queue and blocks until its result is available.
pub async fn run_job(client: &Client, cfg: &Config, model: &str, arguments: Value) -> Result<Value> {
    let submit_url = format!("{}/{}", cfg.fal_queue_url.trim_end_matches('/'), model);
    let resp = client
        .post(&submit_url)
        .header("Authorization", key_header(cfg))
        .json(&arguments)
        .timeout(cfg.http_timeout())
        .send()
        .await
        .with_context(|| format!("fal submit failed: {}", model))?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("fal submit HTTP {} for {}: {}", status.as_u16(), model, snippet(&raw));
    }
    let handle: QueueHandle = serde_json::from_str(&raw)
        .with_context(|| format!("fal submit response not understood: {}", snippet(&raw)))?;
    logi(format!("fal job {} queued ({})", handle.request_id, model));

    let deadline = Instant::now() + cfg.job_timeout();
    loop {
        let value = get_json(client, cfg, &handle.status_url).await?;
        let state: QueueStatus =
            serde_json::from_value(value).context("fal status response not understood")?;
        match classify_status(&state.status) {
            JobState::Done => break,
            JobState::Pending => {}
            JobState::Failed => {
                anyhow::bail!("fal job {} ended with status {}", handle.request_id, state.status)
            }
        }
        if Instant::now() >= deadline {
            anyhow::bail!(
                "fal job {} still {} after {}s",
                handle.request_id,
                state.status,
                cfg.job_timeout().as_secs()
            );
        }
        tokio::time::sleep(cfg.poll_interval()).await;
    }

    get_json(client, cfg, &handle.response_url).await
}

#[derive(Debug, PartialEq, Eq)]
enum JobState {
    Pending,
    Done,
    Failed,
}

fn classify_status(status: &str) -> JobState {
    match status.to_ascii_uppercase().as_str() {
        "COMPLETED" => JobState::Done,
        "IN_QUEUE" | "IN_PROGRESS" => JobState::Pending,
        _ => JobState::Failed,
    }
}

fn first_image_url(result: &Value) -> Result<String> {
    result
        .pointer("/images/0/url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("no image URL in result: {}", snippet(&result.to_string())))
}

fn video_url(result: &Value) -> Result<String> {
    result
        .pointer("/video/url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("no video URL in result: {}", snippet(&result.to_string())))
}

fn audio_url(result: &Value) -> Result<String> {
    result
        .pointer("/audio_file/url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("no audio URL in result: {}", snippet(&result.to_string())))
}

/// Realistic still for an image scene.
pub async fn fal_scene_image(
    client: &Client,
    cfg: &Config,
    prompt: &str,
    aspect: AspectRatio,
) -> Result<String> {
    let args = json!({
        "prompt": prompt,
        "image_size": aspect.image_size(),
        "style": "realistic_image",
    });
    let result = run_job(client, cfg, SCENE_IMAGE_MODEL, args).await?;
    first_image_url(&result)
}

/// Still used as the first frame of an animated scene.
pub async fn fal_seed_image(
    client: &Client,
    cfg: &Config,
    prompt: &str,
    aspect: AspectRatio,
) -> Result<String> {
    let args = json!({
        "prompt": prompt,
        "image_size": aspect.image_size(),
    });
    let result = run_job(client, cfg, SEED_IMAGE_MODEL, args).await?;
    first_image_url(&result)
}

pub async fn fal_image_to_video(
    client: &Client,
    cfg: &Config,
    prompt: &str,
    image_url: &str,
    seconds: u32,
) -> Result<String> {
    let args = json!({
        "prompt": prompt,
        "image_url": image_url,
        "duration": seconds.to_string(),
    });
    let result = run_job(client, cfg, IMAGE_TO_VIDEO_MODEL, args).await?;
    video_url(&result)
}

pub async fn fal_music(client: &Client, cfg: &Config, mood: &str, seconds: u32) -> Result<String> {
    let args = json!({
        "prompt": mood,
        "seconds_total": seconds,
    });
    let result = run_job(client, cfg, MUSIC_MODEL, args).await?;
    audio_url(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_states() {
        assert_eq!(classify_status("IN_QUEUE"), JobState::Pending);
        assert_eq!(classify_status("IN_PROGRESS"), JobState::Pending);
        assert_eq!(classify_status("COMPLETED"), JobState::Done);
        assert_eq!(classify_status("completed"), JobState::Done);
        assert_eq!(classify_status("ERROR"), JobState::Failed);
    }

    #[test]
    fn result_urls() {
        let images = json!({"images": [{"url": "https://cdn/a.png", "width": 720}]});
        assert_eq!(first_image_url(&images).unwrap(), "https://cdn/a.png");

        let video = json!({"video": {"url": "https://cdn/v.mp4"}});
        assert_eq!(video_url(&video).unwrap(), "https://cdn/v.mp4");

        let audio = json!({"audio_file": {"url": "https://cdn/m.wav"}});
        assert_eq!(audio_url(&audio).unwrap(), "https://cdn/m.wav");

        assert!(first_image_url(&json!({"images": []})).is_err());
        assert!(video_url(&images).is_err());
    }

    #[test]
    fn submit_handle_shape() {
        let raw = r#"{"request_id":"abc","response_url":"https://queue.fal.run/x/requests/abc","status_url":"https://queue.fal.run/x/requests/abc/status","cancel_url":"c"}"#;
        let handle: QueueHandle = serde_json::from_str(raw).unwrap();
        assert_eq!(handle.request_id, "abc");
        assert!(handle.status_url.ends_with("/status"));
    }
}
