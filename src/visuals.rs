use crate::api::{self, fal, xai};
use crate::clip_plan::VIDEO_CLIP_SECONDS;
use crate::config::{AspectRatio, Config, ImageProvider};
use crate::scratch::{MediaAsset, MediaKind, Scratch};
use crate::script::{SceneSpec, VisualKind};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;

/// Why a still is being generated; providers may use different models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillPurpose {
    Scene,
    VideoSeed,
}

/// A generated result that still lives on the provider's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMedia {
    pub url: String,
}

#[async_trait]
pub trait VisualSource: Send + Sync {
    async fn still(
        &self,
        prompt: &str,
        purpose: StillPurpose,
        aspect: AspectRatio,
    ) -> Result<RemoteMedia>;

    async fn animate(&self, prompt: &str, seed: &RemoteMedia, seconds: u32) -> Result<RemoteMedia>;

    async fn fetch(&self, media: &RemoteMedia, dest: &Path) -> Result<()>;

    fn supports_video(&self) -> bool {
        true
    }
}

pub struct FalVisuals<'a> {
    client: &'a Client,
    cfg: &'a Config,
}

impl<'a> FalVisuals<'a> {
    pub fn new(client: &'a Client, cfg: &'a Config) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl VisualSource for FalVisuals<'_> {
    async fn still(
        &self,
        prompt: &str,
        purpose: StillPurpose,
        aspect: AspectRatio,
    ) -> Result<RemoteMedia> {
        let url = match purpose {
            StillPurpose::Scene => fal::fal_scene_image(self.client, self.cfg, prompt, aspect).await?,
            StillPurpose::VideoSeed => {
                fal::fal_seed_image(self.client, self.cfg, prompt, aspect).await?
            }
        };
        Ok(RemoteMedia { url })
    }

    async fn animate(&self, prompt: &str, seed: &RemoteMedia, seconds: u32) -> Result<RemoteMedia> {
        let url = fal::fal_image_to_video(self.client, self.cfg, prompt, &seed.url, seconds).await?;
        Ok(RemoteMedia { url })
    }

    async fn fetch(&self, media: &RemoteMedia, dest: &Path) -> Result<()> {
        api::download_to_file(self.client, &media.url, dest, self.cfg.http_timeout()).await
    }
}

/// Grok stills; animation still goes through fal's image-to-video.
pub struct XaiVisuals<'a> {
    client: &'a Client,
    cfg: &'a Config,
}

impl<'a> XaiVisuals<'a> {
    pub fn new(client: &'a Client, cfg: &'a Config) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl VisualSource for XaiVisuals<'_> {
    async fn still(
        &self,
        prompt: &str,
        _purpose: StillPurpose,
        _aspect: AspectRatio,
    ) -> Result<RemoteMedia> {
        let url = xai::xai_generate_image(self.client, self.cfg, prompt).await?;
        Ok(RemoteMedia { url })
    }

    async fn animate(&self, prompt: &str, seed: &RemoteMedia, seconds: u32) -> Result<RemoteMedia> {
        let url = fal::fal_image_to_video(self.client, self.cfg, prompt, &seed.url, seconds).await?;
        Ok(RemoteMedia { url })
    }

    async fn fetch(&self, media: &RemoteMedia, dest: &Path) -> Result<()> {
        api::download_to_file(self.client, &media.url, dest, self.cfg.http_timeout()).await
    }

    fn supports_video(&self) -> bool {
        !crate::config::is_placeholder(&self.cfg.fal_api_key)
    }
}

pub fn source_for<'a>(client: &'a Client, cfg: &'a Config) -> Box<dyn VisualSource + 'a> {
    match cfg.image_provider {
        ImageProvider::Fal => Box::new(FalVisuals::new(client, cfg)),
        ImageProvider::Xai => Box::new(XaiVisuals::new(client, cfg)),
    }
}

/// A downloaded scene asset, tagged with the scene it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAsset {
    pub scene: usize,
    pub asset: MediaAsset,
}

async fn generate_one(
    source: &dyn VisualSource,
    scene: &SceneSpec,
    index: usize,
    aspect: AspectRatio,
    scratch: &Scratch,
) -> Result<MediaAsset> {
    match scene.kind {
        VisualKind::Video if source.supports_video() => {
            let seed = source
                .still(&scene.prompt, StillPurpose::VideoSeed, aspect)
                .await
                .context("seed image")?;
            let clip = source
                .animate(&scene.prompt, &seed, VIDEO_CLIP_SECONDS)
                .await
                .context("image-to-video")?;
            let dest = scratch.raw_video(index);
            source.fetch(&clip, &dest).await.context("video download")?;
            Ok(MediaAsset::new(dest, MediaKind::RawVideo))
        }
        _ => {
            let still = source
                .still(&scene.prompt, StillPurpose::Scene, aspect)
                .await
                .context("image")?;
            let dest = scratch.raw_still(index);
            source.fetch(&still, &dest).await.context("image download")?;
            Ok(MediaAsset::new(dest, MediaKind::StillImage))
        }
    }
}

/// Generates every scene in order, one at a time. A failing scene is logged
/// and left out; the rest carry on.
pub async fn generate_scene_assets(
    source: &dyn VisualSource,
    scenes: &[SceneSpec],
    aspect: AspectRatio,
    scratch: &Scratch,
) -> Vec<RawAsset> {
    if !source.supports_video() && scenes.iter().any(|s| s.kind == VisualKind::Video) {
        logw("Image provider cannot animate; video scenes will be rendered as stills.");
    }

    let mut out = Vec::with_capacity(scenes.len());
    for (index, scene) in scenes.iter().enumerate() {
        logi(format!(
            "Scene {}/{} ({:?}): {}",
            index + 1,
            scenes.len(),
            scene.kind,
            scene.prompt
        ));
        match generate_one(source, scene, index, aspect, scratch).await {
            Ok(asset) => {
                logok(format!("Scene {} ready: {}", index + 1, asset.path.display()));
                out.push(RawAsset {
                    scene: index,
                    asset,
                });
            }
            Err(err) => logw(format!("Scene {} failed, dropping it: {:#}", index + 1, err)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grok_source_animates_only_with_a_fal_key() {
        let client = Client::new();
        let mut cfg = Config {
            image_provider: ImageProvider::Xai,
            xai_api_key: "xai-live".into(),
            ..Config::default()
        };
        assert!(!source_for(&client, &cfg).supports_video());

        cfg.fal_api_key = "fal-live".into();
        assert!(source_for(&client, &cfg).supports_video());
    }
}
