use ai_video_studio::StudioError;
use ai_video_studio::clip_plan::{ClipPlan, VIDEO_CLIP_SECONDS};
use ai_video_studio::config::{AspectRatio, Mode};
use ai_video_studio::ffmpeg::{AudioPlan, Encoder};
use ai_video_studio::generator::normalize_assets;
use ai_video_studio::scratch::{MediaAsset, MediaKind, Scratch};
use ai_video_studio::script::{SceneSpec, VisualKind};
use ai_video_studio::visuals::{
    RawAsset, RemoteMedia, StillPurpose, VisualSource, generate_scene_assets,
};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stands in for the generation APIs; any prompt containing "fail" errors.
struct FakeVisuals {
    video: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeVisuals {
    fn new(video: bool) -> Self {
        Self {
            video,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisualSource for FakeVisuals {
    async fn still(
        &self,
        prompt: &str,
        purpose: StillPurpose,
        aspect: AspectRatio,
    ) -> Result<RemoteMedia> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("still:{:?}:{}:{}", purpose, aspect.image_size(), prompt));
        if prompt.contains("fail") {
            bail!("content policy");
        }
        Ok(RemoteMedia {
            url: format!("https://cdn.test/{}.png", prompt.replace(' ', "_")),
        })
    }

    async fn animate(&self, prompt: &str, seed: &RemoteMedia, seconds: u32) -> Result<RemoteMedia> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("animate:{}s:{}", seconds, seed.url));
        Ok(RemoteMedia {
            url: format!("https://cdn.test/{}.mp4", prompt.replace(' ', "_")),
        })
    }

    async fn fetch(&self, media: &RemoteMedia, dest: &Path) -> Result<()> {
        tokio::fs::write(dest, media.url.as_bytes()).await?;
        Ok(())
    }

    fn supports_video(&self) -> bool {
        self.video
    }
}

fn image(prompt: &str) -> SceneSpec {
    SceneSpec {
        prompt: prompt.to_string(),
        kind: VisualKind::Image,
    }
}

fn video(prompt: &str) -> SceneSpec {
    SceneSpec {
        prompt: prompt.to_string(),
        kind: VisualKind::Video,
    }
}

#[tokio::test]
async fn coffee_slideshow_produces_one_asset_per_scene() {
    let root = tempfile::tempdir().unwrap();
    let scratch = Scratch::create(Some(root.path())).unwrap();
    let scenes: Vec<_> = (0..5).map(|i| image(&format!("coffee scene {}", i))).collect();
    let source = FakeVisuals::new(true);

    let assets = generate_scene_assets(&source, &scenes, AspectRatio::Portrait, &scratch).await;

    assert_eq!(assets.len(), 5);
    assert!(assets.iter().all(|a| a.asset.kind == MediaKind::StillImage));
    assert!(assets.iter().all(|a| a.asset.path.is_file()));
    assert!(source.calls()[0].starts_with("still:Scene:portrait_16_9:"));

    let plan = ClipPlan::for_assets(Mode::Slideshow, 25.0, assets.len()).unwrap();
    assert_eq!(plan.seconds_each, 5.0);
    assert!((plan.total_seconds() - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn failed_scene_is_dropped_and_time_is_rebalanced() {
    let root = tempfile::tempdir().unwrap();
    let scratch = Scratch::create(Some(root.path())).unwrap();
    let scenes = vec![
        image("bean"),
        image("roast"),
        image("fail grind"),
        image("brew"),
        image("cup"),
    ];
    let source = FakeVisuals::new(true);

    let assets = generate_scene_assets(&source, &scenes, AspectRatio::Landscape, &scratch).await;

    let indices: Vec<_> = assets.iter().map(|a| a.scene).collect();
    assert_eq!(indices, vec![0, 1, 3, 4]);
    assert!(!scratch.raw_still(2).exists());

    let plan = ClipPlan::for_assets(Mode::Slideshow, 25.0, assets.len()).unwrap();
    assert_eq!(plan.count, 4);
    assert_eq!(plan.seconds_each, 6.25);
    assert!((plan.total_seconds() - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn video_scene_animates_a_seed_still() {
    let root = tempfile::tempdir().unwrap();
    let scratch = Scratch::create(Some(root.path())).unwrap();
    let scenes = vec![image("harbour"), video("ships racing")];
    let source = FakeVisuals::new(true);

    let assets = generate_scene_assets(&source, &scenes, AspectRatio::Portrait, &scratch).await;

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[1].asset.kind, MediaKind::RawVideo);
    assert_eq!(assets[1].asset.path, scratch.raw_video(1));
    let calls = source.calls();
    assert_eq!(calls[1], "still:VideoSeed:portrait_16_9:ships racing");
    assert_eq!(
        calls[2],
        format!(
            "animate:{}s:https://cdn.test/ships_racing.png",
            VIDEO_CLIP_SECONDS
        )
    );
}

#[tokio::test]
async fn video_scenes_fall_back_to_stills_without_animation() {
    let root = tempfile::tempdir().unwrap();
    let scratch = Scratch::create(Some(root.path())).unwrap();
    let source = FakeVisuals::new(false);

    let assets =
        generate_scene_assets(&source, &[video("waves")], AspectRatio::Portrait, &scratch).await;

    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].asset.kind, MediaKind::StillImage);
    assert!(source.calls().iter().all(|c| !c.starts_with("animate")));
}

#[cfg(unix)]
#[tokio::test]
async fn failing_encoder_never_reports_an_output() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip_0.mp4");
    std::fs::write(&clip, b"not really a video").unwrap();
    let output = dir.path().join("RESULT.mp4");

    let encoder = Encoder::new("false", "false");
    let result = encoder
        .assemble_final_video(
            &[clip],
            &dir.path().join("clips.txt"),
            &AudioPlan::new(Some(PathBuf::from("music.mp3")), None),
            None,
            &output,
        )
        .await;

    assert!(matches!(result, Err(StudioError::AssemblyFailed(_))));
    assert!(!output.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn clean_exit_without_a_file_is_still_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip_0.mp4");
    std::fs::write(&clip, b"x").unwrap();
    let output = dir.path().join("RESULT.mp4");

    let encoder = Encoder::new("true", "true");
    let result = encoder
        .assemble_final_video(
            &[clip],
            &dir.path().join("clips.txt"),
            &AudioPlan::Silent,
            None,
            &output,
        )
        .await;

    assert!(matches!(result, Err(StudioError::AssemblyFailed(_))));
    let list = std::fs::read_to_string(dir.path().join("clips.txt")).unwrap();
    assert!(list.starts_with("file '"));
}

/// Writes an executable shell script standing in for ffmpeg or ffprobe.
#[cfg(unix)]
fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
async fn clip_that_fails_to_encode_hands_its_time_to_the_others() {
    let tools = tempfile::tempdir().unwrap();
    let log = tools.path().join("encodes.log");
    // Fails on scene 2's input, otherwise records "<output> <seconds>" and
    // touches the output file.
    let ffmpeg = fake_tool(
        tools.path(),
        "ffmpeg",
        &format!(
            r#"prev=""
for a in "$@"; do
  case "$prev" in
    -i) input="$a" ;;
    -t) secs="$a" ;;
  esac
  prev="$a"
  out="$a"
done
case "$input" in */raw_2.jpg) echo "unsupported pixel format" >&2; exit 1 ;; esac
echo "$out $secs" >> "{}"
: > "$out"
"#,
            log.display()
        ),
    );
    let ffprobe = fake_tool(tools.path(), "ffprobe", "echo 720x1280\n");
    let encoder = Encoder::new(ffmpeg.display().to_string(), ffprobe.display().to_string());

    let root = tempfile::tempdir().unwrap();
    let scratch = Scratch::create(Some(root.path())).unwrap();
    let assets: Vec<RawAsset> = (0..5)
        .map(|scene| {
            let path = scratch.raw_still(scene);
            std::fs::write(&path, b"jpeg").unwrap();
            RawAsset {
                scene,
                asset: MediaAsset {
                    path,
                    kind: MediaKind::StillImage,
                },
            }
        })
        .collect();

    let normalized = normalize_assets(
        &encoder,
        Mode::Slideshow,
        AspectRatio::Portrait,
        25.0,
        &assets,
        &scratch,
    )
    .await
    .unwrap();

    let expected: Vec<_> = [0, 1, 3, 4].iter().map(|&i| scratch.clip(i)).collect();
    assert_eq!(normalized.clips, expected);
    assert_eq!(normalized.plan.count, 4);
    assert_eq!(normalized.plan.seconds_each, 6.25);

    // The last encode of each kept clip decides its length.
    let mut lengths = std::collections::HashMap::new();
    for line in std::fs::read_to_string(&log).unwrap().lines() {
        let (out, secs) = line.rsplit_once(' ').unwrap();
        lengths.insert(PathBuf::from(out), secs.parse::<f64>().unwrap());
    }
    let total: f64 = normalized.clips.iter().map(|c| lengths[c]).sum();
    assert!((total - 25.0).abs() < 1e-6);
}

#[cfg(unix)]
#[tokio::test]
async fn nothing_left_after_encoding_yields_no_clips() {
    let root = tempfile::tempdir().unwrap();
    let scratch = Scratch::create(Some(root.path())).unwrap();
    let path = scratch.raw_still(0);
    std::fs::write(&path, b"jpeg").unwrap();
    let assets = vec![RawAsset {
        scene: 0,
        asset: MediaAsset {
            path,
            kind: MediaKind::StillImage,
        },
    }];

    let encoder = Encoder::new("false", "false");
    let normalized = normalize_assets(
        &encoder,
        Mode::Slideshow,
        AspectRatio::Portrait,
        25.0,
        &assets,
        &scratch,
    )
    .await;
    assert!(normalized.is_none());
}

#[tokio::test]
async fn assembling_nothing_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Encoder::new("ffmpeg", "ffprobe");
    let result = encoder
        .assemble_final_video(
            &[],
            &dir.path().join("clips.txt"),
            &AudioPlan::Silent,
            None,
            &dir.path().join("out.mp4"),
        )
        .await;
    assert!(matches!(result, Err(StudioError::NoClips)));
}
