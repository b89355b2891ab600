use crate::config::Mode;
use crate::error::{StudioError, StudioResult};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSpec {
    pub prompt: String,
    pub kind: VisualKind,
}

/// The drafted script. Produced once per run and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDocument {
    pub narration: Option<String>,
    pub music_mood: Option<String>,
    pub scenes: Vec<SceneSpec>,
}

#[derive(Debug, Deserialize)]
struct LoopDocument {
    visual_prompt: String,
    #[serde(default)]
    music_mood: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SceneListDocument {
    scenes: Vec<String>,
    #[serde(default)]
    narration: Option<String>,
    #[serde(default)]
    music_mood: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HybridScene {
    #[serde(rename = "type", alias = "kind")]
    kind: VisualKind,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct HybridSceneDocument {
    scenes: Vec<HybridScene>,
    #[serde(default)]
    narration: Option<String>,
    #[serde(default)]
    music_mood: Option<String>,
}

pub fn build_prompt(topic: &str, mode: Mode, scenes: u32) -> String {
    let topic = topic.trim();
    match mode {
        Mode::QuickLoop => format!(
            "Create a looping video concept for '{topic}'.\n\
             Return STRICT JSON with this shape ONLY:\n\
             {{\"visual_prompt\": \"description of the shot\", \"music_mood\": \"description of the music\"}}"
        ),
        Mode::Slideshow => format!(
            "Create a documentary script for '{topic}' with {scenes} scenes.\n\
             Return STRICT JSON with this shape ONLY:\n\
             {{\"scenes\": [\"image prompt 1\", \"image prompt 2\", ...], \"narration\": \"voice-over text\", \"music_mood\": \"description of the music\"}}\n\
             The scenes array must contain exactly {scenes} entries."
        ),
        Mode::Hybrid => format!(
            "Create a hybrid video script for '{topic}' with {scenes} scenes.\n\
             Use 'video' type only for high action, 'image' for static.\n\
             Return STRICT JSON with this shape ONLY:\n\
             {{\"narration\": \"voice-over text\", \"music_mood\": \"description of the music\", \
             \"scenes\": [{{\"type\": \"image\", \"prompt\": \"...\"}}, {{\"type\": \"video\", \"prompt\": \"...\"}}]}}\n\
             The scenes array must contain exactly {scenes} entries."
        ),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn malformed(mode: Mode, err: impl std::fmt::Display) -> StudioError {
    StudioError::MalformedScript(format!("{} script: {}", mode.label(), err))
}

/// Validates the model's reply against the shape requested for `mode`.
pub fn parse_script(mode: Mode, raw: &str) -> StudioResult<ScriptDocument> {
    let doc = match mode {
        Mode::QuickLoop => {
            let doc: LoopDocument = serde_json::from_str(raw).map_err(|e| malformed(mode, e))?;
            ScriptDocument {
                narration: None,
                music_mood: non_blank(doc.music_mood),
                scenes: vec![SceneSpec {
                    prompt: doc.visual_prompt.trim().to_string(),
                    kind: VisualKind::Video,
                }],
            }
        }
        Mode::Slideshow => {
            let doc: SceneListDocument =
                serde_json::from_str(raw).map_err(|e| malformed(mode, e))?;
            ScriptDocument {
                narration: non_blank(doc.narration),
                music_mood: non_blank(doc.music_mood),
                scenes: doc
                    .scenes
                    .into_iter()
                    .map(|prompt| SceneSpec {
                        prompt: prompt.trim().to_string(),
                        kind: VisualKind::Image,
                    })
                    .collect(),
            }
        }
        Mode::Hybrid => {
            let doc: HybridSceneDocument =
                serde_json::from_str(raw).map_err(|e| malformed(mode, e))?;
            ScriptDocument {
                narration: non_blank(doc.narration),
                music_mood: non_blank(doc.music_mood),
                scenes: doc
                    .scenes
                    .into_iter()
                    .map(|scene| SceneSpec {
                        prompt: scene.prompt.trim().to_string(),
                        kind: scene.kind,
                    })
                    .collect(),
            }
        }
    };

    if doc.scenes.is_empty() {
        return Err(malformed(mode, "no scenes"));
    }
    if let Some(idx) = doc.scenes.iter().position(|s| s.prompt.is_empty()) {
        return Err(malformed(mode, format!("scene {} has an empty prompt", idx)));
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slideshow_document() {
        let raw = r#"{"scenes":["beans on a branch","a 17th century cafe"],"narration":"Coffee began in Ethiopia.","music_mood":"warm acoustic"}"#;
        let doc = parse_script(Mode::Slideshow, raw).unwrap();
        assert_eq!(doc.scenes.len(), 2);
        assert!(doc.scenes.iter().all(|s| s.kind == VisualKind::Image));
        assert_eq!(doc.narration.as_deref(), Some("Coffee began in Ethiopia."));
        assert_eq!(doc.music_mood.as_deref(), Some("warm acoustic"));
    }

    #[test]
    fn hybrid_document_keeps_kinds_in_order() {
        let raw = r#"{
            "narration": "text",
            "music_mood": "epic",
            "scenes": [
                {"type": "image", "prompt": "a harbour"},
                {"type": "video", "prompt": "ships racing"},
                {"kind": "image", "prompt": "a map"}
            ]
        }"#;
        let doc = parse_script(Mode::Hybrid, raw).unwrap();
        let kinds: Vec<_> = doc.scenes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![VisualKind::Image, VisualKind::Video, VisualKind::Image]
        );
    }

    #[test]
    fn loop_document_is_one_video_scene_without_narration() {
        let raw = r#"{"visual_prompt":"ocean waves at dusk","music_mood":"ambient"}"#;
        let doc = parse_script(Mode::QuickLoop, raw).unwrap();
        assert_eq!(doc.narration, None);
        assert_eq!(
            doc.scenes,
            vec![SceneSpec {
                prompt: "ocean waves at dusk".into(),
                kind: VisualKind::Video
            }]
        );
    }

    #[test]
    fn blank_narration_counts_as_absent() {
        let raw = r#"{"scenes":["a"],"narration":"   "}"#;
        let doc = parse_script(Mode::Slideshow, raw).unwrap();
        assert_eq!(doc.narration, None);
        assert_eq!(doc.music_mood, None);
    }

    #[test]
    fn shape_mismatches_are_fatal() {
        assert!(matches!(
            parse_script(Mode::Slideshow, "not json"),
            Err(StudioError::MalformedScript(_))
        ));
        // hybrid shape sent back for a slideshow request
        assert!(matches!(
            parse_script(Mode::Slideshow, r#"{"scenes":[{"type":"image","prompt":"x"}]}"#),
            Err(StudioError::MalformedScript(_))
        ));
        assert!(matches!(
            parse_script(Mode::Hybrid, r#"{"scenes":[{"type":"gif","prompt":"x"}]}"#),
            Err(StudioError::MalformedScript(_))
        ));
        assert!(matches!(
            parse_script(Mode::Slideshow, r#"{"scenes":[]}"#),
            Err(StudioError::MalformedScript(_))
        ));
        assert!(matches!(
            parse_script(Mode::Slideshow, r#"{"scenes":["ok", " "]}"#),
            Err(StudioError::MalformedScript(_))
        ));
    }

    #[test]
    fn prompts_name_the_requested_shape() {
        let p = build_prompt("The history of coffee", Mode::Slideshow, 5);
        assert!(p.contains("'The history of coffee'"));
        assert!(p.contains("5 scenes"));
        assert!(p.contains("\"narration\""));

        let p = build_prompt("x", Mode::Hybrid, 3);
        assert!(p.contains("\"type\": \"video\""));

        let p = build_prompt("x", Mode::QuickLoop, 9);
        assert!(p.contains("\"visual_prompt\""));
        assert!(!p.contains("9 scenes"));
    }
}
