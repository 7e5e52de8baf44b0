use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    Teams,
    Leadr,
    Vtt,
    Srt,
    Json,
    Docx,
    Generic,
}

impl TranscriptFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptFormat::Teams => "teams",
            TranscriptFormat::Leadr => "leadr",
            TranscriptFormat::Vtt => "vtt",
            TranscriptFormat::Srt => "srt",
            TranscriptFormat::Json => "json",
            TranscriptFormat::Docx => "docx",
            TranscriptFormat::Generic => "generic",
        }
    }

    pub fn format_tag(&self) -> String {
        format!("format:{}", self.as_str())
    }
}

impl fmt::Display for TranscriptFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn normalize_hint(hint: Option<&str>) -> Option<String> {
    let trimmed = hint?.trim().trim_start_matches('.').to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

// Classification precedence: structural markers (WEBVTT header, "-->" timing
// arrows) beat content heuristics (Teams/Leadr keyword shapes), which beat
// hint-only dispatch. Unmatched input is always generic, never an error.
pub fn detect_format(text: &str, hint: Option<&str>) -> TranscriptFormat {
    let hint = normalize_hint(hint);
    let hint = hint.as_deref();
    let format = if hint == Some("docx") {
        TranscriptFormat::Docx
    } else if hint == Some("vtt") || text.to_lowercase().contains("webvtt") {
        TranscriptFormat::Vtt
    } else if hint == Some("srt") || text.contains("-->") {
        TranscriptFormat::Srt
    } else if bracket_speaker_regex().is_match(text) || text.contains("Teams Meeting Transcript") {
        TranscriptFormat::Teams
    } else if text.contains("Coach:") && text.contains("Direct Report:") {
        TranscriptFormat::Leadr
    } else if hint == Some("json") {
        TranscriptFormat::Json
    } else {
        TranscriptFormat::Generic
    };
    debug!("detected transcript format {format} (hint: {hint:?})");
    format
}

fn bracket_speaker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?m)^\s*\[\d{1,2}:\d{2}(?::\d{2})?\]\s*[^:\r\n]+:")
            .expect("invalid bracket speaker regex")
    })
}
