use crate::parsers::{collapse_whitespace, tidy_speaker};
use serde_json::Value;
use tracing::warn;

// Key aliases probed on every object, in priority order; the first key whose
// value yields a usable string wins.
pub(crate) const SPEAKER_KEYS: &[&str] = &["speaker", "name", "role", "participant"];
pub(crate) const TEXT_KEYS: &[&str] = &["text", "content", "utterance", "message", "note", "transcript"];

pub(crate) struct JsonWalk {
    pub lines: Vec<String>,
    pub participants: Vec<String>,
}

// Schema-free extraction: walk the parsed value looking for objects that pair
// a speaker-like field with a text-like field. Malformed JSON yields None so
// the caller can re-route the raw text through the generic path.
pub(crate) fn walk_json_text(text: &str) -> Option<JsonWalk> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!("transcript JSON payload failed to parse: {err}");
            return None;
        }
    };
    let mut walk = JsonWalk {
        lines: Vec::new(),
        participants: Vec::new(),
    };
    visit(&value, &mut walk);
    Some(walk)
}

fn visit(value: &Value, walk: &mut JsonWalk) {
    match value {
        Value::Array(items) => {
            for item in items {
                visit(item, walk);
            }
        }
        Value::Object(map) => {
            let speaker = first_string_field(map, SPEAKER_KEYS);
            let text = first_string_field(map, TEXT_KEYS);
            if let (Some(speaker), Some(text)) = (speaker, text) {
                // a matched pair makes this object a leaf record
                let speaker = tidy_speaker(&speaker);
                let text = collapse_whitespace(&text);
                if speaker.is_empty() {
                    if !text.is_empty() {
                        walk.lines.push(text);
                    }
                    return;
                }
                if !walk.participants.iter().any(|existing| existing == &speaker) {
                    walk.participants.push(speaker.clone());
                }
                walk.lines.push(format!("{speaker}: {text}"));
                return;
            }
            for item in map.values() {
                visit(item, walk);
            }
        }
        Value::String(text) => {
            let collapsed = collapse_whitespace(text);
            if !collapsed.is_empty() {
                walk.lines.push(collapsed);
            }
        }
        _ => {}
    }
}

fn first_string_field(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        let Some(value) = map.get(*key) else {
            continue;
        };
        match value {
            Value::String(text) if !text.trim().is_empty() => return Some(text.clone()),
            Value::Array(items) => {
                for item in items {
                    if let Value::String(text) = item {
                        if !text.trim().is_empty() {
                            return Some(text.clone());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_pair() {
        let walk = walk_json_text(r#"[{"speaker":"Bob","text":"Hello"}]"#).unwrap();
        assert_eq!(walk.lines, vec!["Bob: Hello"]);
        assert_eq!(walk.participants, vec!["Bob"]);
    }

    #[test]
    fn test_alias_priority() {
        // "speaker" outranks "name", "text" outranks "message"
        let walk = walk_json_text(
            r#"{"name":"ignored","speaker":"Ann","message":"ignored too","text":"hi"}"#,
        )
        .unwrap();
        assert_eq!(walk.lines, vec!["Ann: hi"]);
    }

    #[test]
    fn test_list_valued_field_takes_first_string() {
        let walk =
            walk_json_text(r#"{"speaker":"Cal","text":["", "first real entry", "second"]}"#)
                .unwrap();
        assert_eq!(walk.lines, vec!["Cal: first real entry"]);
    }

    #[test]
    fn test_matched_object_is_a_leaf() {
        let payload = r#"{"speaker":"Dee","text":"outer","nested":{"speaker":"X","text":"inner"}}"#;
        let walk = walk_json_text(payload).unwrap();
        assert_eq!(walk.lines, vec!["Dee: outer"]);
        assert_eq!(walk.participants, vec!["Dee"]);
    }

    #[test]
    fn test_recursion_and_bare_strings() {
        let payload = r#"{"meta":{"title":"weekly sync"},"entries":[{"speaker":"Eve","text":"status update"}]}"#;
        let walk = walk_json_text(payload).unwrap();
        assert_eq!(walk.lines, vec!["weekly sync", "Eve: status update"]);
        assert_eq!(walk.participants, vec!["Eve"]);
    }

    #[test]
    fn test_no_pairs_yields_empty_walk() {
        let walk = walk_json_text(r#"{"foo": 1}"#).unwrap();
        assert!(walk.lines.is_empty());
        assert!(walk.participants.is_empty());
    }

    #[test]
    fn test_malformed_json_is_none() {
        assert!(walk_json_text("{not json").is_none());
    }

    #[test]
    fn test_whitespace_collapsed() {
        let walk = walk_json_text(r#"[{"speaker":" Fay  Ray ","text":"one\n  two"}]"#).unwrap();
        assert_eq!(walk.lines, vec!["Fay Ray: one two"]);
        assert_eq!(walk.participants, vec!["Fay Ray"]);
    }
}
