use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

fn timing_regex() -> Result<&'static Regex> {
    static TIMING_RE: OnceCell<Regex> = OnceCell::new();
    TIMING_RE.get_or_try_init(|| {
        Regex::new(
            r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})",
        )
        .context("failed to compile srt timing regex")
    })
}

fn to_seconds(hh: &str, mm: &str, ss: &str, frac: &str) -> Option<f64> {
    let hh: f64 = hh.parse().ok()?;
    let mm: f64 = mm.parse().ok()?;
    let ss: f64 = ss.parse().ok()?;
    // "5" after the comma means 500ms, not 5ms
    let ms: f64 = format!("{:0<3}", frac).parse().ok()?;
    Some(hh * 3600.0 + mm * 60.0 + ss + ms / 1000.0)
}

/// Removes the italic markup some transcribers emit.
pub fn clean_markup(input: &str) -> String {
    input.replace("<i>", "").replace("</i>", "")
}

pub fn parse_cues(input: &str) -> Result<Vec<Cue>> {
    let re = timing_regex()?;
    let normalized = input.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty()).peekable();
        let index = match lines.peek() {
            Some(first) if !first.contains("-->") => {
                let idx = first.trim().parse::<u32>().unwrap_or(0);
                lines.next();
                idx
            }
            Some(_) => 0,
            None => continue,
        };

        let Some(timing) = lines.next() else {
            continue;
        };
        let Some(caps) = re.captures(timing) else {
            continue;
        };
        let (Some(start), Some(end)) = (
            to_seconds(&caps[1], &caps[2], &caps[3], &caps[4]),
            to_seconds(&caps[5], &caps[6], &caps[7], &caps[8]),
        ) else {
            continue;
        };

        let text = lines.map(str::trim).collect::<Vec<_>>().join("\n");
        cues.push(Cue {
            index,
            start,
            end,
            text,
        });
    }

    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\r\n00:00:00,000 --> 00:00:02,500\r\n<i>Coffee began</i> in Ethiopia.\r\n\r\n2\r\n00:00:02,500 --> 00:01:04,05\r\nGoats found it first.\r\nOr so they say.\r\n";

    #[test]
    fn parses_whisper_style_srt() {
        let cues = parse_cues(&clean_markup(SAMPLE)).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, 0.0);
        assert_eq!(cues[0].end, 2.5);
        assert_eq!(cues[0].text, "Coffee began in Ethiopia.");
        assert!((cues[1].end - 64.05).abs() < 1e-9);
        assert_eq!(cues[1].text, "Goats found it first.\nOr so they say.");
    }

    #[test]
    fn garbage_has_no_cues() {
        assert!(parse_cues("").unwrap().is_empty());
        assert!(parse_cues("Sorry, I can't transcribe that.").unwrap().is_empty());
    }

    #[test]
    fn clean_markup_strips_italics_only() {
        assert_eq!(clean_markup("<i>a</i> <b>b</b>"), "a <b>b</b>");
    }
}
