use crate::api::snippet;
use crate::config::{Config, Voice};
use crate::logw;
use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::multipart;
use serde_json::json;
use std::path::Path;
use tokio::fs;

fn api_url(base: &str, path: &str) -> String {
    format!("{}/v1/{}", base.trim_end_matches('/'), path)
}

fn log_api_error(provider: &str, raw: &str) {
    let Ok(root) = serde_json::from_str::<serde_json::Value>(raw) else {
        return;
    };
    let Some(err) = root.get("error") else {
        return;
    };
    if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
        logw(format!("{} error message: {}", provider, msg));
    }
    if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
        logw(format!("{} error code: {}", provider, code));
    }
}

/// Pulls `choices[0].message.content` out of a chat-completion response.
fn extract_message_content(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;
    root.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// Chat completion with JSON output enforced. Works against OpenAI and any
/// compatible endpoint (xAI) selected in the config.
pub async fn openai_chat_json(client: &Client, cfg: &Config, prompt: &str) -> Result<String> {
    let (base, key, model) = cfg.chat_endpoint();
    let body = json!({
        "model": model,
        "messages": [
            {"role": "system", "content": "You are a helpful assistant designed to output JSON."},
            {"role": "user", "content": prompt},
        ],
        "response_format": {"type": "json_object"},
    });

    let resp = client
        .post(api_url(base, "chat/completions"))
        .bearer_auth(key)
        .json(&body)
        .timeout(cfg.http_timeout())
        .send()
        .await
        .context("chat completion request failed")?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        log_api_error("Chat", &raw);
        anyhow::bail!("chat completion HTTP {}: {}", status.as_u16(), snippet(&raw));
    }

    extract_message_content(&raw)
        .with_context(|| format!("chat completion had no message content: {}", snippet(&raw)))
}

pub async fn openai_tts_to_mp3(
    client: &Client,
    cfg: &Config,
    text: &str,
    voice: Voice,
    out_mp3_path: &Path,
) -> Result<()> {
    let body = json!({
        "model": cfg.tts_model,
        "voice": voice.id(),
        "input": text,
    });

    let resp = client
        .post(api_url(&cfg.openai_base_url, "audio/speech"))
        .bearer_auth(&cfg.openai_api_key)
        .json(&body)
        .timeout(cfg.http_timeout())
        .send()
        .await
        .context("speech request failed")?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let raw = resp.text().await.unwrap_or_default();
        log_api_error("OpenAI TTS", &raw);
        anyhow::bail!("speech HTTP {}", status);
    }

    let bytes = resp.bytes().await.context("speech response read failed")?;
    if bytes.is_empty() {
        anyhow::bail!("speech response was empty");
    }
    fs::write(out_mp3_path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out_mp3_path.display()))?;
    Ok(())
}

/// Uploads narration audio and returns the transcript as SRT text.
pub async fn openai_transcribe_srt(client: &Client, cfg: &Config, audio: &Path) -> Result<String> {
    let bytes = fs::read(audio)
        .await
        .with_context(|| format!("Failed to read {}", audio.display()))?;
    let file_name = audio
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("voice.mp3")
        .to_string();

    let part = multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("audio/mpeg")
        .context("failed to build multipart part")?;
    let form = multipart::Form::new()
        .part("file", part)
        .text("model", cfg.transcribe_model.clone())
        .text("response_format", "srt");

    let resp = client
        .post(api_url(&cfg.openai_base_url, "audio/transcriptions"))
        .bearer_auth(&cfg.openai_api_key)
        .multipart(form)
        .timeout(cfg.http_timeout())
        .send()
        .await
        .context("transcription request failed")?;

    let status = resp.status();
    let raw = resp.text().await.context("transcription body read failed")?;
    if !status.is_success() {
        log_api_error("OpenAI transcription", &raw);
        anyhow::bail!("transcription HTTP {}", status.as_u16());
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_content() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"scenes\":[]}"}}]}"#;
        assert_eq!(
            extract_message_content(raw).as_deref(),
            Some(r#"{"scenes":[]}"#)
        );
    }

    #[test]
    fn missing_content_is_none() {
        assert_eq!(extract_message_content(r#"{"choices":[]}"#), None);
        assert_eq!(extract_message_content(r#"{"error":{"message":"bad key"}}"#), None);
        assert_eq!(extract_message_content("<html>"), None);
    }

    #[test]
    fn urls_tolerate_trailing_slash() {
        assert_eq!(
            api_url("https://api.x.ai/", "chat/completions"),
            "https://api.x.ai/v1/chat/completions"
        );
    }
}
