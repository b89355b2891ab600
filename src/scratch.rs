use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// What a file on disk holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    StillImage,
    RawVideo,
    NormalizedClip,
    Subtitles,
}

/// A generated or downloaded file. Each pipeline step writes a new asset
/// instead of touching an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaAsset {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Per-run working directory. Removed when dropped unless kept.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("studio-run-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("Failed to create scratch root {}", root.display()))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("Failed to create scratch directory")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn voice(&self) -> PathBuf {
        self.file("voice.mp3")
    }

    pub fn music(&self) -> PathBuf {
        self.file("music.mp3")
    }

    pub fn subtitles(&self) -> PathBuf {
        self.file("subtitles.srt")
    }

    pub fn concat_list(&self) -> PathBuf {
        self.file("clips.txt")
    }

    pub fn raw_still(&self, index: usize) -> PathBuf {
        self.file(&format!("raw_{}.jpg", index))
    }

    pub fn raw_video(&self, index: usize) -> PathBuf {
        self.file(&format!("raw_{}.mp4", index))
    }

    pub fn clip(&self, index: usize) -> PathBuf {
        self.file(&format!("clip_{}.mp4", index))
    }

    /// Detaches the directory from cleanup and returns where it lives.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let scratch = Scratch::create(Some(root.path())).unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(scratch.voice(), b"id3").unwrap();
        assert!(path.is_dir());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn kept_scratch_survives() {
        let root = tempfile::tempdir().unwrap();
        let scratch = Scratch::create(Some(root.path())).unwrap();
        let kept = scratch.keep();
        assert!(kept.is_dir());
        assert!(kept.file_name().unwrap().to_string_lossy().starts_with("studio-run-"));
    }

    #[test]
    fn runs_get_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = Scratch::create(Some(root.path())).unwrap();
        let b = Scratch::create(Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.clip(3).file_name().unwrap(), "clip_3.mp4");
        assert_eq!(a.raw_video(0).file_name().unwrap(), "raw_0.mp4");
    }
}
