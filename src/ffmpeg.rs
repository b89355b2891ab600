use crate::config::Config;
use crate::error::{StudioError, StudioResult};
use crate::logw;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

pub const FRAME_RATE: u32 = 25;
pub const PIXEL_FORMAT: &str = "yuv420p";
const VIDEO_CODEC: &str = "libx264";
const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "192k";

const MUSIC_UNDER_VOICE_GAIN: &str = "0.1";
const VOICE_GAIN: &str = "1.3";
const MUSIC_ALONE_GAIN: &str = "1.0";

const SUBTITLE_STYLE: &str = "Fontsize=18,PrimaryColour=&Hffffff,OutlineColour=&H000000,BorderStyle=1,Outline=1,Shadow=0,Alignment=2,MarginV=50";

const STILL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Which normalization path an input file takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualInput {
    Still,
    Video,
}

impl VisualInput {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if STILL_EXTENSIONS.contains(&ext.as_str()) {
            VisualInput::Still
        } else {
            VisualInput::Video
        }
    }
}

/// Audio inputs available to the final mix, and how they are combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPlan {
    MusicAndVoice { music: PathBuf, voice: PathBuf },
    MusicOnly { music: PathBuf },
    VoiceOnly { voice: PathBuf },
    Silent,
}

impl AudioPlan {
    pub fn new(music: Option<PathBuf>, voice: Option<PathBuf>) -> Self {
        match (music, voice) {
            (Some(music), Some(voice)) => AudioPlan::MusicAndVoice { music, voice },
            (Some(music), None) => AudioPlan::MusicOnly { music },
            (None, Some(voice)) => AudioPlan::VoiceOnly { voice },
            (None, None) => AudioPlan::Silent,
        }
    }

    /// Extra `-i` inputs, in order, after the concat input at index 0.
    fn input_args(&self) -> Vec<String> {
        let looped = |path: &Path| {
            vec![
                "-stream_loop".to_string(),
                "-1".to_string(),
                "-i".to_string(),
                path.display().to_string(),
            ]
        };
        match self {
            AudioPlan::MusicAndVoice { music, voice } => {
                let mut args = looped(music);
                args.extend(["-i".to_string(), voice.display().to_string()]);
                args
            }
            AudioPlan::MusicOnly { music } => looped(music),
            AudioPlan::VoiceOnly { voice } => vec!["-i".to_string(), voice.display().to_string()],
            AudioPlan::Silent => vec![
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                "anullsrc=channel_layout=stereo:sample_rate=44100".to_string(),
            ],
        }
    }

    pub fn filter(&self) -> String {
        match self {
            AudioPlan::MusicAndVoice { .. } => format!(
                "[1:a]volume={}[bg];[2:a]volume={}[speech];[bg][speech]amix=inputs=2:duration=shortest[a_out]",
                MUSIC_UNDER_VOICE_GAIN, VOICE_GAIN
            ),
            AudioPlan::MusicOnly { .. } => format!("[1:a]volume={}[a_out]", MUSIC_ALONE_GAIN),
            AudioPlan::VoiceOnly { .. } => format!("[1:a]volume={}[a_out]", VOICE_GAIN),
            AudioPlan::Silent => "[1:a]anull[a_out]".to_string(),
        }
    }
}

/// Escapes a path for a single-quoted filter option. The graph parser strips
/// the quotes and the option parser then reads `\:` and `\'` as literals.
/// Inside the quotes `, ; [ ]` need nothing.
pub fn escape_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut escaped = String::with_capacity(normalized.len() + 12);
    for ch in normalized.chars() {
        match ch {
            ':' => escaped.push_str("\\:"),
            // Close the quotes, emit `\'` for the option parser, reopen.
            '\'' => escaped.push_str("'\\\\\\''"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// `null` pass-through, or subtitle burn-in with the fixed caption style.
pub fn video_filter(subtitles: Option<&Path>) -> String {
    match subtitles {
        Some(srt) => format!(
            "subtitles='{}':force_style='{}'",
            escape_filter_path(srt),
            SUBTITLE_STYLE
        ),
        None => "null".to_string(),
    }
}

/// Scale to fit, centre on a black canvas of exactly `width`x`height`.
pub fn fit_filter(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
        w = width,
        h = height
    )
}

/// Concat demuxer list; single quotes in paths use the `'\''` escape.
pub fn concat_list(clips: &[PathBuf]) -> String {
    let mut out = String::new();
    for clip in clips {
        let escaped = clip.display().to_string().replace('\'', "'\\''");
        out.push_str(&format!("file '{}'\n", escaped));
    }
    out
}

fn base_args() -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}

pub fn normalize_args(
    input: &Path,
    output: &Path,
    seconds: f64,
    width: u32,
    height: u32,
) -> Vec<String> {
    let fit = fit_filter(width, height);
    let mut args = base_args();
    match VisualInput::from_path(input) {
        VisualInput::Still => {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-i".to_string(),
                input.display().to_string(),
                "-vf".to_string(),
                format!("{},format={}", fit, PIXEL_FORMAT),
            ]);
        }
        VisualInput::Video => {
            args.extend([
                "-stream_loop".to_string(),
                "-1".to_string(),
                "-i".to_string(),
                input.display().to_string(),
                "-vf".to_string(),
                format!("{},fps={},format={}", fit, FRAME_RATE, PIXEL_FORMAT),
                "-an".to_string(),
            ]);
        }
    }
    args.extend([
        "-c:v".to_string(),
        VIDEO_CODEC.to_string(),
        "-t".to_string(),
        format!("{:.3}", seconds),
        "-pix_fmt".to_string(),
        PIXEL_FORMAT.to_string(),
        "-r".to_string(),
        FRAME_RATE.to_string(),
        output.display().to_string(),
    ]);
    args
}

pub fn assemble_args(
    list_txt: &Path,
    audio: &AudioPlan,
    subtitles: Option<&Path>,
    output: &Path,
) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
    ]);
    args.extend(audio.input_args());
    args.extend([
        "-filter_complex".to_string(),
        format!("{};[0:v]{}[v_out]", audio.filter(), video_filter(subtitles)),
        "-map".to_string(),
        "[v_out]".to_string(),
        "-map".to_string(),
        "[a_out]".to_string(),
        "-c:v".to_string(),
        VIDEO_CODEC.to_string(),
        "-pix_fmt".to_string(),
        PIXEL_FORMAT.to_string(),
        "-c:a".to_string(),
        AUDIO_CODEC.to_string(),
        "-b:a".to_string(),
        AUDIO_BITRATE.to_string(),
        "-shortest".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.display().to_string(),
    ]);
    args
}

/// The external encoder and prober.
#[derive(Debug, Clone)]
pub struct Encoder {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Encoder {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.ffmpeg.clone(), cfg.ffprobe.clone())
    }

    pub async fn check(&self) -> StudioResult<()> {
        match Command::new(&self.ffmpeg).arg("-version").output().await {
            Ok(output) if output.status.success() => Ok(()),
            _ => Err(StudioError::EncoderMissing(self.ffmpeg.clone())),
        }
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let output = Command::new(&self.ffmpeg)
            .args(args)
            .output()
            .await
            .with_context(|| format!("failed to start {}", self.ffmpeg))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(6).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            anyhow::bail!(
                "{} exited with {}: {}",
                self.ffmpeg,
                output.status,
                tail.join(" | ")
            );
        }
        Ok(())
    }

    pub async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .context("ffprobe duration failed")?;

        if !output.status.success() {
            return Err(anyhow::anyhow!("ffprobe failed"));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let duration = text.parse::<f64>().unwrap_or(-1.0);
        if duration <= 0.1 {
            return Err(anyhow::anyhow!("Invalid duration"));
        }
        Ok(duration)
    }

    pub async fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=s=x:p=0",
            ])
            .arg(path)
            .output()
            .await
            .context("ffprobe execution failed")?;

        if !output.status.success() {
            return Err(anyhow::anyhow!("ffprobe failed"));
        }

        parse_dimensions(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| anyhow::anyhow!("Invalid dimensions"))
    }

    /// Re-encodes one raw still or video into a uniform clip.
    pub async fn normalize_visual(
        &self,
        input: &Path,
        output: &Path,
        seconds: f64,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.run(&normalize_args(input, output, seconds, width, height))
            .await
            .with_context(|| format!("normalize {}", input.display()))?;

        if fs::metadata(output).await.is_err() {
            anyhow::bail!("encoder reported success but {} is missing", output.display());
        }

        match self.probe_dimensions(output).await {
            Ok(dims) if dims == (width, height) => {}
            Ok((w, h)) => logw(format!(
                "{} came out {}x{} instead of {}x{}",
                output.display(),
                w,
                h,
                width,
                height
            )),
            Err(err) => logw(format!("Could not probe {}: {}", output.display(), err)),
        }
        Ok(())
    }

    /// Concatenates the clips, mixes audio, optionally burns in subtitles.
    /// On failure any partial output is removed.
    pub async fn assemble_final_video(
        &self,
        clips: &[PathBuf],
        list_txt: &Path,
        audio: &AudioPlan,
        subtitles: Option<&Path>,
        output: &Path,
    ) -> StudioResult<PathBuf> {
        if clips.is_empty() {
            return Err(StudioError::NoClips);
        }
        fs::write(list_txt, concat_list(clips))
            .await
            .with_context(|| format!("Failed to write {}", list_txt.display()))?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create dir {}", parent.display()))?;
            }
        }

        let args = assemble_args(list_txt, audio, subtitles, output);
        if let Err(err) = self.run(&args).await {
            let _ = fs::remove_file(output).await;
            return Err(StudioError::AssemblyFailed(format!("{:#}", err)));
        }
        if fs::metadata(output).await.is_err() {
            return Err(StudioError::AssemblyFailed(format!(
                "encoder exited cleanly but {} was not written",
                output.display()
            )));
        }
        Ok(output.to_path_buf())
    }
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.trim().split('x');
    let w = parts.next()?.trim().parse::<u32>().ok()?;
    let h = parts.next()?.trim().parse::<u32>().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}
