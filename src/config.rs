use crate::error::{StudioError, StudioResult};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const MIN_SCENES: u32 = 1;
pub const MAX_SCENES: u32 = 20;
pub const DEFAULT_SCENES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One animated scene looped under generated music.
    QuickLoop,
    /// Narrated documentary built from still images.
    #[default]
    Slideshow,
    /// Narrated mix of still images and short animated clips, with subtitles.
    Hybrid,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Slideshow, Mode::Hybrid, Mode::QuickLoop];

    pub fn label(self) -> &'static str {
        match self {
            Mode::QuickLoop => "Quick Loop",
            Mode::Slideshow => "Story Mode (Slideshow)",
            Mode::Hybrid => "Hybrid Pro (Video+Img+Subs)",
        }
    }

    pub fn has_narration(self) -> bool {
        !matches!(self, Mode::QuickLoop)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// 9:16, 720x1280
    #[default]
    #[value(name = "9:16", alias = "portrait")]
    Portrait,
    /// 16:9, 1280x720
    #[value(name = "16:9", alias = "landscape")]
    Landscape,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 2] = [AspectRatio::Portrait, AspectRatio::Landscape];

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            AspectRatio::Portrait => (720, 1280),
            AspectRatio::Landscape => (1280, 720),
        }
    }

    /// Size preset understood by the image generators.
    pub fn image_size(self) -> &'static str {
        match self {
            AspectRatio::Portrait => "portrait_16_9",
            AspectRatio::Landscape => "landscape_16_9",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16 (TikTok)",
            AspectRatio::Landscape => "16:9 (YouTube)",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Onyx,
    Alloy,
    Echo,
    Shimmer,
    Nova,
    Fable,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Onyx,
        Voice::Alloy,
        Voice::Echo,
        Voice::Shimmer,
        Voice::Nova,
        Voice::Fable,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Voice::Onyx => "onyx",
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Shimmer => "shimmer",
            Voice::Nova => "nova",
            Voice::Fable => "fable",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    #[default]
    OpenAi,
    Xai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    #[default]
    Fal,
    Xai,
}

/// Provider credentials and tunables. Loaded once, then passed by reference
/// to every component that talks to an API or runs the encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: String,
    pub fal_api_key: String,
    pub xai_api_key: String,

    pub chat_provider: ChatProvider,
    pub image_provider: ImageProvider,

    pub openai_base_url: String,
    pub xai_base_url: String,
    pub fal_queue_url: String,

    pub openai_chat_model: String,
    pub xai_chat_model: String,
    pub xai_image_model: String,
    pub tts_model: String,
    pub transcribe_model: String,

    pub ffmpeg: String,
    pub ffprobe: String,

    pub http_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub job_timeout_secs: u64,

    pub scratch_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            fal_api_key: String::new(),
            xai_api_key: String::new(),
            chat_provider: ChatProvider::OpenAi,
            image_provider: ImageProvider::Fal,
            openai_base_url: "https://api.openai.com".to_string(),
            xai_base_url: "https://api.x.ai".to_string(),
            fal_queue_url: "https://queue.fal.run".to_string(),
            openai_chat_model: "gpt-4o".to_string(),
            xai_chat_model: "grok-2-latest".to_string(),
            xai_image_model: "grok-2-image".to_string(),
            tts_model: "tts-1".to_string(),
            transcribe_model: "whisper-1".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            http_timeout_secs: 300,
            poll_interval_ms: 1_000,
            job_timeout_secs: 900,
            scratch_root: None,
        }
    }
}

impl Config {
    /// Reads the JSON config if it exists (defaults otherwise) and applies
    /// environment overrides for the credentials.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if fs::metadata(path).await.is_ok() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 3] = [
            ("OPENAI_API_KEY", &mut self.openai_api_key),
            ("FAL_KEY", &mut self.fal_api_key),
            ("XAI_API_KEY", &mut self.xai_api_key),
        ];
        for (var, slot) in overrides {
            if let Some(value) = lookup(var) {
                if !value.trim().is_empty() {
                    *slot = value.trim().to_string();
                }
            }
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs.max(1))
    }

    /// Base URL, key and model for the configured chat provider.
    pub fn chat_endpoint(&self) -> (&str, &str, &str) {
        match self.chat_provider {
            ChatProvider::OpenAi => (
                self.openai_base_url.as_str(),
                self.openai_api_key.as_str(),
                self.openai_chat_model.as_str(),
            ),
            ChatProvider::Xai => (
                self.xai_base_url.as_str(),
                self.xai_api_key.as_str(),
                self.xai_chat_model.as_str(),
            ),
        }
    }

    pub fn require_credentials(&self, run: &RunConfig) -> StudioResult<()> {
        match self.chat_provider {
            ChatProvider::OpenAi => require_key(&self.openai_api_key, "OpenAI API key")?,
            ChatProvider::Xai => require_key(&self.xai_api_key, "xAI API key")?,
        }
        if run.mode.has_narration() {
            require_key(&self.openai_api_key, "OpenAI API key (narration)")?;
        }
        // Grok images without a fal key still run; video scenes become stills.
        match self.image_provider {
            ImageProvider::Fal => require_key(&self.fal_api_key, "fal.ai key")?,
            ImageProvider::Xai => require_key(&self.xai_api_key, "xAI API key (images)")?,
        }
        Ok(())
    }
}

fn require_key(value: &str, what: &'static str) -> StudioResult<()> {
    if is_placeholder(value) {
        return Err(StudioError::MissingCredential(what));
    }
    Ok(())
}

pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || (v.starts_with('[') && v.ends_with(']')) || v.contains("YOUR_")
}

/// Options for one run. Built once by the CLI or GUI, read-only afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub topic: String,
    pub mode: Mode,
    pub aspect: AspectRatio,
    pub scenes: u32,
    pub voice: Voice,
    pub subtitles: bool,
    pub music_upload: Option<PathBuf>,
    pub output: PathBuf,
    pub keep_scratch: bool,
}

impl RunConfig {
    pub fn new(topic: impl Into<String>, mode: Mode, output: impl Into<PathBuf>) -> Self {
        Self {
            topic: topic.into(),
            mode,
            aspect: AspectRatio::default(),
            scenes: DEFAULT_SCENES,
            voice: Voice::default(),
            subtitles: true,
            music_upload: None,
            output: output.into(),
            keep_scratch: false,
        }
    }

    /// QuickLoop always renders a single scene regardless of the requested count.
    pub fn effective_scenes(&self) -> u32 {
        match self.mode {
            Mode::QuickLoop => 1,
            _ => self.scenes,
        }
    }

    pub fn validate(&self) -> StudioResult<()> {
        if self.topic.trim().is_empty() {
            return Err(StudioError::InvalidRun("topic is empty".to_string()));
        }
        if !(MIN_SCENES..=MAX_SCENES).contains(&self.scenes) {
            return Err(StudioError::InvalidRun(format!(
                "scene count {} outside {}..={}",
                self.scenes, MIN_SCENES, MAX_SCENES
            )));
        }
        if let Some(music) = &self.music_upload {
            if !music.is_file() {
                return Err(StudioError::InvalidRun(format!(
                    "music file not found: {}",
                    music.display()
                )));
            }
        }
        if self.output.as_os_str().is_empty() {
            return Err(StudioError::InvalidRun("output path is empty".to_string()));
        }
        Ok(())
    }
}

/// Default output name, stamped with the local time so runs don't collide.
pub fn default_output_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("studio_{}.mp4", stamp))
}
