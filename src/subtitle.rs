use crate::api::openai;
use crate::config::Config;
use crate::srt;
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use tokio::fs;

/// Checks a transcript before it is written out for burn-in: markup is
/// stripped and at least one timed cue must be present.
pub fn prepare_srt(raw: &str) -> Result<String> {
    let cleaned = srt::clean_markup(raw);
    let cues = srt::parse_cues(&cleaned)?;
    if cues.is_empty() {
        anyhow::bail!("transcript contained no subtitle cues");
    }
    Ok(cleaned)
}

/// Transcribes the narration and writes `dest`. Returns the number of cues.
pub async fn generate_subtitles(
    client: &Client,
    cfg: &Config,
    narration: &Path,
    dest: &Path,
) -> Result<usize> {
    let raw = openai::openai_transcribe_srt(client, cfg, narration).await?;
    let srt_text = prepare_srt(&raw)?;
    let count = srt::parse_cues(&srt_text)?.len();
    fs::write(dest, srt_text.as_bytes())
        .await
        .with_context(|| format!("create srt output: {}", dest.display()))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_transcript_with_cues() {
        let raw = "1\n00:00:00,000 --> 00:00:01,200\n<i>Hello</i>\n";
        assert_eq!(prepare_srt(raw).unwrap(), "1\n00:00:00,000 --> 00:00:01,200\nHello\n");
    }

    #[test]
    fn rejects_empty_transcript() {
        assert!(prepare_srt("").is_err());
        assert!(prepare_srt("\n\n").is_err());
    }
}
