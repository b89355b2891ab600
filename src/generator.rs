use crate::api::{self, fal, openai};
use crate::clip_plan::{self, ClipPlan, FALLBACK_NARRATION_SECONDS};
use crate::config::{AspectRatio, Config, Mode, RunConfig, is_placeholder};
use crate::error::{StudioError, StudioResult};
use crate::ffmpeg::{AudioPlan, Encoder};
use crate::scratch::Scratch;
use crate::script::{self, ScriptDocument};
use crate::subtitle;
use crate::visuals::{self, RawAsset};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::PathBuf;

/// Narration audio plus the duration every later stage is timed against.
struct Narration {
    audio: Option<PathBuf>,
    seconds: f64,
}

async fn draft_script(client: &Client, cfg: &Config, run: &RunConfig) -> StudioResult<ScriptDocument> {
    let scenes = run.effective_scenes();
    logi(format!(
        "1. Script: {} for '{}' ({} scene{})",
        run.mode,
        run.topic,
        scenes,
        if scenes == 1 { "" } else { "s" }
    ));
    let prompt = script::build_prompt(&run.topic, run.mode, scenes);
    let raw = openai::openai_chat_json(client, cfg, &prompt)
        .await
        .map_err(StudioError::ScriptRequest)?;
    let doc = script::parse_script(run.mode, &raw)?;
    if doc.scenes.len() != scenes as usize {
        logw(format!(
            "Asked for {} scenes, script has {}; using the script's count",
            scenes,
            doc.scenes.len()
        ));
    }
    logok(format!(
        "Script ready: {} scene(s), narration {}",
        doc.scenes.len(),
        if doc.narration.is_some() { "yes" } else { "no" }
    ));
    Ok(doc)
}

/// Length of the narration as the user reads it, not its UTF-8 byte count.
fn narration_chars(text: &str) -> usize {
    text.chars().count()
}

async fn synthesize_narration(
    client: &Client,
    cfg: &Config,
    encoder: &Encoder,
    run: &RunConfig,
    doc: &ScriptDocument,
    scratch: &Scratch,
) -> Narration {
    let Some(text) = doc.narration.as_deref() else {
        logi("2. Narration: none in script, skipping");
        return Narration {
            audio: None,
            seconds: FALLBACK_NARRATION_SECONDS,
        };
    };

    logi(format!(
        "2. Narration: voice '{}' ({} chars)",
        run.voice,
        narration_chars(text)
    ));
    let voice_path = scratch.voice();
    if let Err(err) = openai::openai_tts_to_mp3(client, cfg, text, run.voice, &voice_path).await {
        logw(format!("Voice-over failed, continuing without narration: {:#}", err));
        return Narration {
            audio: None,
            seconds: FALLBACK_NARRATION_SECONDS,
        };
    }

    let seconds = match encoder.probe_duration(&voice_path).await {
        Ok(v) => v,
        Err(err) => {
            logw(format!(
                "Could not measure narration ({:#}); assuming {:.0}s",
                err, FALLBACK_NARRATION_SECONDS
            ));
            FALLBACK_NARRATION_SECONDS
        }
    };
    logok(format!("Narration: {:.2}s -> {}", seconds, voice_path.display()));
    Narration {
        audio: Some(voice_path),
        seconds,
    }
}

async fn make_subtitles(
    client: &Client,
    cfg: &Config,
    run: &RunConfig,
    narration: &Narration,
    scratch: &Scratch,
) -> Option<PathBuf> {
    if !run.subtitles {
        logi("3. Subtitles: disabled");
        return None;
    }
    let Some(audio) = narration.audio.as_deref() else {
        logi("3. Subtitles: no narration audio, skipping");
        return None;
    };

    logi("3. Subtitles: transcribing narration");
    let dest = scratch.subtitles();
    match subtitle::generate_subtitles(client, cfg, audio, &dest).await {
        Ok(cues) => {
            logok(format!("Subtitles: {} cue(s) -> {}", cues, dest.display()));
            Some(dest)
        }
        Err(err) => {
            logw(format!("Subtitles failed, continuing without them: {:#}", err));
            None
        }
    }
}

async fn generate_music(
    client: &Client,
    cfg: &Config,
    mood: &str,
    seconds: u32,
    scratch: &Scratch,
) -> Result<PathBuf> {
    let url = fal::fal_music(client, cfg, mood, seconds)
        .await
        .context("music generation")?;
    let dest = scratch.music();
    api::download_to_file(client, &url, &dest, cfg.http_timeout())
        .await
        .context("music download")?;
    Ok(dest)
}

async fn fetch_music(
    client: &Client,
    cfg: &Config,
    run: &RunConfig,
    doc: &ScriptDocument,
    narration: &Narration,
    scratch: &Scratch,
) -> Option<PathBuf> {
    if let Some(upload) = &run.music_upload {
        logi(format!("4. Music: using {}", upload.display()));
        return Some(upload.clone());
    }
    if is_placeholder(&cfg.fal_api_key) {
        logw("4. Music: no fal.ai key, continuing without music");
        return None;
    }

    let seconds = clip_plan::music_seconds(run.mode, narration.seconds);
    let mood = doc.music_mood.as_deref().unwrap_or(run.topic.as_str());
    logi(format!("4. Music: {}s of '{}'", seconds, mood));
    match generate_music(client, cfg, mood, seconds, scratch).await {
        Ok(path) => {
            logok(format!("Music -> {}", path.display()));
            Some(path)
        }
        Err(err) => {
            logw(format!("Music failed, continuing without it: {:#}", err));
            None
        }
    }
}

/// Normalized clips and the plan they were encoded with.
#[derive(Debug)]
pub struct NormalizedClips {
    pub clips: Vec<PathBuf>,
    pub plan: ClipPlan,
}

/// Encodes every asset to its share of the narration. When one fails the
/// narration is re-divided over the survivors and they are encoded again,
/// so the kept clips always add up to the narration. `None` once nothing
/// survives.
pub async fn normalize_assets(
    encoder: &Encoder,
    mode: Mode,
    aspect: AspectRatio,
    narration_seconds: f64,
    assets: &[RawAsset],
    scratch: &Scratch,
) -> Option<NormalizedClips> {
    let (width, height) = aspect.dimensions();
    let mut pending: Vec<&RawAsset> = assets.iter().collect();

    loop {
        let plan = ClipPlan::for_assets(mode, narration_seconds, pending.len())?;
        logi(format!(
            "6. Normalizing {} clip(s) to {}x{}, {:.2}s each",
            plan.count, width, height, plan.seconds_each
        ));

        let mut clips = Vec::with_capacity(pending.len());
        let mut survivors = Vec::with_capacity(pending.len());
        for raw in &pending {
            let out = scratch.clip(raw.scene);
            match encoder
                .normalize_visual(&raw.asset.path, &out, plan.seconds_each, width, height)
                .await
            {
                Ok(()) => {
                    clips.push(out);
                    survivors.push(*raw);
                }
                Err(err) => logw(format!(
                    "Scene {} could not be normalized, dropping it: {:#}",
                    raw.scene + 1,
                    err
                )),
            }
        }

        if survivors.len() == pending.len() {
            return Some(NormalizedClips { clips, plan });
        }
        if !survivors.is_empty() {
            logw(format!(
                "{} clip(s) left; re-encoding them to cover {:.2}s of narration",
                survivors.len(),
                narration_seconds
            ));
        }
        pending = survivors;
    }
}

async fn run_stages(
    cfg: &Config,
    run: &RunConfig,
    client: &Client,
    encoder: &Encoder,
    scratch: &Scratch,
) -> StudioResult<PathBuf> {
    let doc = draft_script(client, cfg, run).await?;
    let narration = synthesize_narration(client, cfg, encoder, run, &doc, scratch).await;
    let subtitles = make_subtitles(client, cfg, run, &narration, scratch).await;
    let music = fetch_music(client, cfg, run, &doc, &narration, scratch).await;

    logi(format!("5. Visuals: {} scene(s)", doc.scenes.len()));
    let source = visuals::source_for(client, cfg);
    let assets = visuals::generate_scene_assets(&*source, &doc.scenes, run.aspect, scratch).await;
    if assets.len() < doc.scenes.len() {
        logw(format!(
            "{} of {} scenes survived; narration time is re-divided across them",
            assets.len(),
            doc.scenes.len()
        ));
    }

    let NormalizedClips { clips, .. } = normalize_assets(
        encoder,
        run.mode,
        run.aspect,
        narration.seconds,
        &assets,
        scratch,
    )
    .await
    .ok_or(StudioError::NoClips)?;

    let audio = AudioPlan::new(music, narration.audio);
    if audio == AudioPlan::Silent {
        logw("No music and no narration; the video will have a silent track");
    }
    logi(format!("7. Assembling {} clip(s) -> {}", clips.len(), run.output.display()));
    let out = encoder
        .assemble_final_video(
            &clips,
            &scratch.concat_list(),
            &audio,
            subtitles.as_deref(),
            &run.output,
        )
        .await?;
    logok(format!("Wrote output: {}", out.display()));
    Ok(out)
}

/// Runs the whole pipeline once. The scratch directory is removed on every
/// exit path unless the run asked to keep it.
pub async fn run_generation(cfg: &Config, run: &RunConfig) -> StudioResult<PathBuf> {
    run.validate()?;
    let encoder = Encoder::from_config(cfg);
    encoder.check().await?;
    cfg.require_credentials(run)?;

    let client = Client::builder()
        .gzip(true)
        .build()
        .context("Failed to build HTTP client")?;
    let scratch = Scratch::create(cfg.scratch_root.as_deref())?;
    logi(format!("Scratch directory: {}", scratch.path().display()));

    let result = run_stages(cfg, run, &client, &encoder, &scratch).await;

    if run.keep_scratch {
        let kept = scratch.keep();
        logi(format!("Kept scratch directory: {}", kept.display()));
    }
    match &result {
        Ok(_) => logok("DONE"),
        Err(err) => logw(format!("FAILED: {}", err)),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narration_length_counts_characters() {
        assert_eq!(narration_chars("Kaffee"), 6);
        assert_eq!(narration_chars("Café ☕"), 6);
        assert_eq!(narration_chars("Історія кави"), 12);
    }
}
