use crate::config::Mode;

/// Narration length assumed when there is no narration audio to measure.
pub const FALLBACK_NARRATION_SECONDS: f64 = 5.0;
/// Length of the single clip rendered in QuickLoop mode.
pub const LOOP_CLIP_SECONDS: f64 = 10.0;
/// Length requested from the image-to-video generator.
pub const VIDEO_CLIP_SECONDS: u32 = 5;

const LOOP_MUSIC_SECONDS: u32 = 15;
const MUSIC_MARGIN_SECONDS: f64 = 5.0;
const MAX_MUSIC_SECONDS: u32 = 45;

/// How long each normalized clip runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlan {
    pub seconds_each: f64,
    pub count: usize,
}

impl ClipPlan {
    /// Narration time is split evenly across the scenes that actually
    /// produced an asset, so dropped scenes never leave a gap.
    pub fn for_assets(mode: Mode, narration_seconds: f64, assets: usize) -> Option<Self> {
        if assets == 0 {
            return None;
        }
        let seconds_each = match mode {
            Mode::QuickLoop => LOOP_CLIP_SECONDS,
            _ => {
                let total = if narration_seconds > 0.0 {
                    narration_seconds
                } else {
                    FALLBACK_NARRATION_SECONDS
                };
                total / assets as f64
            }
        };
        Some(Self {
            seconds_each,
            count: assets,
        })
    }

    pub fn total_seconds(&self) -> f64 {
        self.seconds_each * self.count as f64
    }
}

/// Target length for generated background music.
pub fn music_seconds(mode: Mode, narration_seconds: f64) -> u32 {
    match mode {
        Mode::QuickLoop => LOOP_MUSIC_SECONDS,
        _ => ((narration_seconds + MUSIC_MARGIN_SECONDS).floor().max(1.0) as u32)
            .min(MAX_MUSIC_SECONDS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coffee_scenario_splits_evenly() {
        let plan = ClipPlan::for_assets(Mode::Slideshow, 25.0, 5).unwrap();
        assert_eq!(plan.seconds_each, 5.0);
        assert_eq!(plan.count, 5);
        assert!((plan.total_seconds() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn dropped_scene_rebalances_over_survivors() {
        // 5 scenes requested, scene 2 failed
        let plan = ClipPlan::for_assets(Mode::Hybrid, 25.0, 4).unwrap();
        assert_eq!(plan.seconds_each, 6.25);
        assert!((plan.total_seconds() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn sum_matches_narration_for_awkward_splits() {
        for n in 1..=20 {
            let plan = ClipPlan::for_assets(Mode::Slideshow, 37.41, n).unwrap();
            assert!((plan.total_seconds() - 37.41).abs() < 1e-6, "n={n}");
        }
    }

    #[test]
    fn loop_mode_uses_fixed_clip_length() {
        let plan = ClipPlan::for_assets(Mode::QuickLoop, FALLBACK_NARRATION_SECONDS, 1).unwrap();
        assert_eq!(plan.seconds_each, LOOP_CLIP_SECONDS);
    }

    #[test]
    fn no_assets_no_plan() {
        assert!(ClipPlan::for_assets(Mode::Slideshow, 25.0, 0).is_none());
    }

    #[test]
    fn music_length_is_margin_plus_narration_capped() {
        assert_eq!(music_seconds(Mode::Slideshow, 25.0), 30);
        assert_eq!(music_seconds(Mode::Slideshow, 25.9), 30);
        assert_eq!(music_seconds(Mode::Hybrid, 120.0), 45);
        assert_eq!(music_seconds(Mode::QuickLoop, 120.0), 15);
    }
}
