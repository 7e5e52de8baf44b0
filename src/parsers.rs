use regex::Regex;
use std::sync::OnceLock;

// Colon-heuristic thresholds for promoting a line prefix to a speaker label.
// Tuned values carried over from production; do not re-derive.
pub(crate) const MAX_SPEAKER_PREFIX_CHARS: usize = 80;
pub(crate) const MAX_SPEAKER_WORDS: usize = 6;

pub(crate) const LEADR_ROLE_LABELS: &[&str] = &[
    "Coach",
    "Leader",
    "Manager",
    "Direct Report",
    "DirectReport",
    "Employee",
];

// Emitted when a coaching export carries dialogue before any role label.
pub(crate) const LEADR_FALLBACK_LABEL: &str = "Coach/DirectReport";

pub(crate) struct ParsedLines {
    pub lines: Vec<String>,
    pub participants: Vec<String>,
}

// Accumulates dialogue chunks line by line. Text pushed while a speaker is
// active merges into that speaker's buffer; with no active speaker (and no
// fallback label) each line flushes immediately as its own bare chunk, so
// unattributed text keeps its original line structure.
pub(crate) struct ChunkBuilder {
    lines: Vec<String>,
    participants: Vec<String>,
    speaker: Option<String>,
    buffer: Vec<String>,
    fallback_speaker: Option<&'static str>,
}

impl ChunkBuilder {
    pub(crate) fn new() -> Self {
        ChunkBuilder {
            lines: Vec::new(),
            participants: Vec::new(),
            speaker: None,
            buffer: Vec::new(),
            fallback_speaker: None,
        }
    }

    pub(crate) fn with_fallback(label: &'static str) -> Self {
        let mut builder = ChunkBuilder::new();
        builder.fallback_speaker = Some(label);
        builder
    }

    pub(crate) fn set_speaker(&mut self, raw: &str) {
        self.flush();
        let tidied = tidy_speaker(raw);
        if tidied.is_empty() {
            self.speaker = None;
            return;
        }
        self.record_participant(&tidied);
        self.speaker = Some(tidied);
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.speaker.is_none() && self.fallback_speaker.is_none() {
            self.lines.push(trimmed.to_string());
            return;
        }
        self.buffer.push(trimmed.to_string());
    }

    pub(crate) fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let joined = self.buffer.join(" ");
        self.buffer.clear();
        if let Some(name) = self.speaker.clone() {
            self.lines.push(format!("{name}: {joined}"));
        } else if let Some(label) = self.fallback_speaker {
            self.record_participant(label);
            self.lines.push(format!("{label}: {joined}"));
        } else {
            self.lines.push(joined);
        }
    }

    fn record_participant(&mut self, name: &str) {
        if !self.participants.iter().any(|existing| existing == name) {
            self.participants.push(name.to_string());
        }
    }

    pub(crate) fn finish(mut self) -> ParsedLines {
        self.flush();
        ParsedLines {
            lines: self.lines,
            participants: self.participants,
        }
    }
}

// Speaker labels arrive with export artifacts: surrounding brackets,
// zero-width characters, uneven whitespace.
pub(crate) fn tidy_speaker(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '[' | ']' | '(' | ')' | '{' | '}' | '<' | '>' => {}
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}' | '\u{feff}' => {}
            _ => cleaned.push(ch),
        }
    }
    collapse_whitespace(&cleaned)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut output = String::new();
    let mut last_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_space && !output.is_empty() {
                output.push(' ');
                last_space = true;
            }
            continue;
        }
        output.push(ch);
        last_space = false;
    }
    output.trim_end().to_string()
}

pub(crate) fn speaker_prefix_plausible(prefix: &str) -> bool {
    let trimmed = prefix.trim();
    !trimmed.is_empty()
        && prefix.chars().count() < MAX_SPEAKER_PREFIX_CHARS
        && trimmed.split_whitespace().count() <= MAX_SPEAKER_WORDS
        && trimmed.chars().any(|ch| ch.is_alphabetic())
}

fn strip_bullet(line: &str) -> Option<&str> {
    let rest = bullet_regex().find(line).map(|m| &line[m.end()..])?;
    Some(rest)
}

fn bullet_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[-•]\s*").expect("invalid bullet regex"))
}

fn timestamp_only_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\d{1,2}:\d{2}(?::\d{2})?$").expect("invalid timestamp regex"))
}

fn teams_bracket_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\[\d{1,2}:\d{2}(?::\d{2})?\]\s*([^:\r\n]+?)\s*:\s*(.*)$")
            .expect("invalid teams bracket regex")
    })
}

fn teams_dash_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(.+?)\s+-\s+\d{1,2}:\d{2}(?::\d{2})?\s+-\s+(.*)$")
            .expect("invalid teams dash regex")
    })
}

// A colon splits the line into speaker and utterance only when the prefix is
// short enough to be a name and the colon is followed by whitespace (or ends
// the line). The whitespace requirement keeps URLs and clock readings intact.
fn split_speaker_colon(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(':')?;
    if idx == 0 {
        return None;
    }
    let after = &line[idx + 1..];
    if !(after.is_empty() || after.starts_with(char::is_whitespace)) {
        return None;
    }
    if !speaker_prefix_plausible(&line[..idx]) {
        return None;
    }
    Some((&line[..idx], after))
}

// Chat export shape: "[h:mm] Speaker: body" entries with two fallback shapes,
// tried in fixed priority. Unmatched lines continue the active utterance.
pub(crate) fn parse_teams(text: &str) -> ParsedLines {
    let mut chunks = ChunkBuilder::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || timestamp_only_regex().is_match(line) {
            continue;
        }
        if let Some(caps) = teams_bracket_regex().captures(line) {
            chunks.set_speaker(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
            chunks.push_text(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
            continue;
        }
        // bare "Speaker: body"; the dash guard keeps the third shape reachable
        if let Some((name, body)) = split_speaker_colon(line) {
            if !name.contains(" - ") {
                chunks.set_speaker(name);
                chunks.push_text(body);
                continue;
            }
        }
        if let Some(caps) = teams_dash_regex().captures(line) {
            chunks.set_speaker(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
            chunks.push_text(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
            continue;
        }
        chunks.push_text(line);
    }
    chunks.finish()
}

fn match_role_line(line: &str) -> Option<(&'static str, &str)> {
    for &label in LEADR_ROLE_LABELS {
        if line.len() < label.len() || !line.is_char_boundary(label.len()) {
            continue;
        }
        let (head, tail) = line.split_at(label.len());
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }
        let tail = tail.trim_start();
        if let Some(body) = tail.strip_prefix(':') {
            return Some((label, body.trim()));
        }
    }
    None
}

// Coaching export shape: fixed role labels, either standalone "Role:" lines
// followed by the utterance or inline "Role: utterance".
pub(crate) fn parse_leadr(text: &str) -> ParsedLines {
    let mut chunks = ChunkBuilder::with_fallback(LEADR_FALLBACK_LABEL);
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((label, body)) = match_role_line(line) {
            chunks.set_speaker(label);
            chunks.push_text(body);
            continue;
        }
        if let Some(rest) = strip_bullet(line) {
            chunks.push_text(rest);
            continue;
        }
        chunks.push_text(line);
    }
    chunks.finish()
}

// Strips caption cue metadata (header, sequence numbers, timing lines) so the
// remaining spoken text can go through the generic reconstruction.
pub(crate) fn strip_caption_cues(text: &str) -> String {
    let mut kept = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.to_uppercase().starts_with("WEBVTT") {
            continue;
        }
        if line.chars().all(|ch| ch.is_ascii_digit()) {
            continue;
        }
        if line.contains("-->") {
            continue;
        }
        kept.push(line);
    }
    kept.join("\n")
}

// Best-effort fallback for unstructured text; also backs the caption and DOCX
// paths once their cue/markup layers are stripped.
pub(crate) fn parse_generic(text: &str) -> ParsedLines {
    let mut chunks = ChunkBuilder::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, body)) = split_speaker_colon(line) {
            chunks.set_speaker(name);
            chunks.push_text(body);
            continue;
        }
        if let Some(rest) = strip_bullet(line) {
            chunks.push_text(rest);
            continue;
        }
        chunks.push_text(line);
    }
    chunks.finish()
}
