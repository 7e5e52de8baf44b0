use crate::format::{detect_format, TranscriptFormat};
use crate::json_walker;
use crate::parsers::{self, ParsedLines};
use anyhow::{anyhow, Result};
use encoding_rs::Encoding;
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const JSON_NO_PAIRS_WARNING: &str = "No speaker/content pairs detected in JSON payload.";

// Canonical import result: speaker-tagged dialogue lines plus provenance.
// Constructed fresh on every call; callers own it and replace rather than
// mutate (re-normalizing the content reproduces the record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedTranscript {
    pub content: String,
    pub tags: Vec<String>,
    pub participants: Vec<String>,
    pub detected_format: TranscriptFormat,
    pub warnings: Vec<String>,
}

// Normalize pasted text. Never fails: unmatched input routes through the
// generic reconstruction with a best-effort result.
pub fn normalize_transcript_text(text: &str, hint: Option<&str>) -> ImportedTranscript {
    let text = scrub_input(text);
    let format = detect_format(&text, hint);
    match format {
        TranscriptFormat::Teams => from_parsed(parsers::parse_teams(&text), format),
        TranscriptFormat::Leadr => from_parsed(parsers::parse_leadr(&text), format),
        TranscriptFormat::Vtt | TranscriptFormat::Srt => caption_transcript(&text, format),
        TranscriptFormat::Json => match json_transcript(&text) {
            Some(result) => result,
            None => from_parsed(parsers::parse_generic(&text), TranscriptFormat::Generic),
        },
        // docx text arrives pre-extracted; only the tag differs from generic
        TranscriptFormat::Docx => from_parsed(parsers::parse_generic(&text), format),
        TranscriptFormat::Generic => from_parsed(parsers::parse_generic(&text), format),
    }
}

// Import a transcript file. Dispatch is by extension / MIME prefix, not
// content sniffing; the whole file is read into memory (single-meeting
// transcripts, not bulk corpora). The DOCX path is the only one that can
// fail.
pub async fn import_transcript_file(path: &Path, mime: Option<&str>) -> Result<ImportedTranscript> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    if extension == "docx" {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || crate::docx::extract_docx_text(&owned))
            .await
            .map_err(|err| anyhow!(err.to_string()))??;
        return Ok(normalize_transcript_text(&text, Some("docx")));
    }

    let data = tokio::fs::read(path).await?;
    let text = decode_text_bytes(&data);
    let mime_type = mime.and_then(|value| value.parse::<Mime>().ok());
    let is_json_mime = mime_type
        .as_ref()
        .map(|m| m.type_() == mime::APPLICATION && m.subtype() == mime::JSON)
        .unwrap_or(false);
    let is_text_mime = mime_type
        .as_ref()
        .map(|m| m.type_() == mime::TEXT)
        .unwrap_or(false);

    if extension == "json" || is_json_mime {
        if let Some(result) = json_transcript(&scrub_input(&text)) {
            return Ok(result);
        }
        debug!("json import fell back to plain text normalization");
        return Ok(normalize_transcript_text(&text, None));
    }
    if extension == "vtt" || text.trim_start().starts_with("WEBVTT") {
        return Ok(normalize_transcript_text(&text, Some("vtt")));
    }
    if extension == "srt" {
        return Ok(normalize_transcript_text(&text, Some("srt")));
    }
    if extension == "csv" || extension == "tsv" || is_text_mime {
        let hint = (!extension.is_empty()).then_some(extension.as_str());
        return Ok(normalize_transcript_text(&text, hint));
    }
    Ok(normalize_transcript_text(&text, None))
}

// Case-sensitive set union, first occurrence wins.
pub fn merge_tags(manual: &[String], detected: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for tag in manual.iter().chain(detected.iter()) {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if !merged.iter().any(|existing| existing == tag) {
            merged.push(tag.to_string());
        }
    }
    merged
}

fn from_parsed(parsed: ParsedLines, format: TranscriptFormat) -> ImportedTranscript {
    let tags = match format {
        TranscriptFormat::Generic => Vec::new(),
        other => vec![other.format_tag()],
    };
    ImportedTranscript {
        content: parsed.lines.join("\n"),
        tags,
        participants: parsed.participants,
        detected_format: format,
        warnings: Vec::new(),
    }
}

fn caption_transcript(text: &str, format: TranscriptFormat) -> ImportedTranscript {
    // the generic pass does not know which caption flavor it served; the
    // caller's format carries through to the final record and tag
    let spoken = parsers::strip_caption_cues(text);
    from_parsed(parsers::parse_generic(&spoken), format)
}

fn json_transcript(text: &str) -> Option<ImportedTranscript> {
    let walk = json_walker::walk_json_text(text)?;
    let warnings = if walk.lines.is_empty() {
        vec![JSON_NO_PAIRS_WARNING.to_string()]
    } else {
        Vec::new()
    };
    Some(ImportedTranscript {
        content: walk.lines.join("\n"),
        tags: vec![TranscriptFormat::Json.format_tag()],
        participants: walk.participants,
        detected_format: TranscriptFormat::Json,
        warnings,
    })
}

// Pasted text can carry a byte-order mark and stray NULs from clipboard
// round-trips through other tools.
fn scrub_input(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.contains('\0') {
        text.replace('\0', "")
    } else {
        text.to_string()
    }
}

fn decode_text_bytes(data: &[u8]) -> String {
    for label in ["utf-8", "utf-8-sig", "gb18030", "latin-1"] {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            let (decoded, _, had_errors) = encoding.decode(data);
            if !had_errors && !decoded.is_empty() {
                return decoded.to_string();
            }
        }
    }
    String::from_utf8_lossy(data).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_plain_text() {
        let result = normalize_transcript_text("first note\nsecond note", None);
        assert_eq!(result.detected_format, TranscriptFormat::Generic);
        assert_eq!(result.content, "first note\nsecond note");
        assert!(result.tags.is_empty());
        assert!(result.participants.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_input_is_generic() {
        let result = normalize_transcript_text("", None);
        assert_eq!(result.detected_format, TranscriptFormat::Generic);
        assert!(result.content.is_empty());
        assert!(result.participants.is_empty());
    }

    #[test]
    fn test_bom_and_nuls_scrubbed() {
        let result = normalize_transcript_text("\u{feff}Alice: h\0i", None);
        assert_eq!(result.content, "Alice: hi");
        assert_eq!(result.participants, vec!["Alice"]);
    }

    #[test]
    fn test_teams_transcript_tagged() {
        let result = normalize_transcript_text("[00:01] Alice: Hi there\nThanks for joining", None);
        assert_eq!(result.detected_format, TranscriptFormat::Teams);
        assert_eq!(result.content, "Alice: Hi there Thanks for joining");
        assert_eq!(result.tags, vec!["format:teams"]);
    }

    #[test]
    fn test_vtt_forces_format_and_tag() {
        let text = "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nAlice: hello\n00:00:05.000 --> 00:00:06.000\nwelcome back";
        let result = normalize_transcript_text(text, None);
        assert_eq!(result.detected_format, TranscriptFormat::Vtt);
        assert_eq!(result.tags, vec!["format:vtt"]);
        assert_eq!(result.content, "Alice: hello welcome back");
        assert_eq!(result.participants, vec!["Alice"]);
    }

    #[test]
    fn test_srt_hint() {
        let text = "1\n00:00:01,000 --> 00:00:02,000\nBob: hi";
        let result = normalize_transcript_text(text, Some("srt"));
        assert_eq!(result.detected_format, TranscriptFormat::Srt);
        assert_eq!(result.tags, vec!["format:srt"]);
        assert_eq!(result.content, "Bob: hi");
    }

    #[test]
    fn test_json_pairs() {
        let result = normalize_transcript_text(r#"[{"speaker":"Bob","text":"Hello"}]"#, Some("json"));
        assert_eq!(result.detected_format, TranscriptFormat::Json);
        assert_eq!(result.content, "Bob: Hello");
        assert_eq!(result.participants, vec!["Bob"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_json_without_pairs_warns() {
        let result = normalize_transcript_text(r#"{"foo": 1}"#, Some("json"));
        assert_eq!(result.detected_format, TranscriptFormat::Json);
        assert!(result.content.is_empty());
        assert_eq!(result.warnings, vec![JSON_NO_PAIRS_WARNING]);
    }

    #[test]
    fn test_malformed_json_falls_back_to_generic() {
        let result = normalize_transcript_text("not json at all", Some("json"));
        assert_eq!(result.detected_format, TranscriptFormat::Generic);
        assert_eq!(result.content, "not json at all");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let first = normalize_transcript_text("Coach: Let's discuss.\nDirect Report: Sounds good.", None);
        assert_eq!(first.detected_format, TranscriptFormat::Leadr);
        let second = normalize_transcript_text(&first.content, None);
        // re-detection lands on leadr again here since both labels survive in
        // the emitted lines; attribution must be reproduced either way
        assert_eq!(second.content, first.content);
        assert_eq!(second.participants, first.participants);
    }

    #[test]
    fn test_plain_roundtrip_is_generic() {
        let first = normalize_transcript_text("[00:02] Mara: update done\nshipping tomorrow", None);
        assert_eq!(first.detected_format, TranscriptFormat::Teams);
        let second = normalize_transcript_text(&first.content, None);
        assert_eq!(second.detected_format, TranscriptFormat::Generic);
        assert_eq!(second.content, first.content);
        assert_eq!(second.participants, first.participants);
    }

    #[test]
    fn test_merge_tags_dedup() {
        let manual = vec!["growth".to_string(), "growth".to_string()];
        let detected = vec!["format:teams".to_string()];
        assert_eq!(merge_tags(&manual, &detected), vec!["growth", "format:teams"]);
    }

    #[test]
    fn test_merge_tags_case_sensitive() {
        let manual = vec!["Growth".to_string(), "growth".to_string()];
        assert_eq!(merge_tags(&manual, &[]), vec!["Growth", "growth"]);
    }

    #[test]
    fn test_decode_text_bytes_lossy_fallback() {
        let decoded = decode_text_bytes(&[0xff, 0xfe, b'h', b'i']);
        assert!(!decoded.is_empty());
    }
}
