//! Lenient decoding of model output

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

lazy_static! {
    static ref OPENING_FENCE: Regex = Regex::new(r"^```(?:json)?\s*").expect("valid regex");
    static ref CLOSING_FENCE: Regex = Regex::new(r"\s*```$").expect("valid regex");
    static ref TRAILING_COMMA: Regex = Regex::new(r",\s*([}\]])").expect("valid regex");
}

/// A vocabulary term returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    /// Base form
    pub original: String,
    /// As written in the text
    pub text: String,
    pub part_of_speech: String,
    pub meaning: String,
}

/// Parse JSON the way models tend to get it wrong
///
/// Tolerates a BOM, code fences, smart quotes and trailing commas. Failing
/// that, the first balanced object or array that parses is used.
pub fn parse_lenient_json(raw: &str) -> Option<Value> {
    let text = raw.trim_start_matches('\u{FEFF}').trim();
    let text = OPENING_FENCE.replace(text, "");
    let text = CLOSING_FENCE.replace(&text, "");
    let text = text.replace(['\u{201C}', '\u{201D}'], "\"").replace(['\u{2018}', '\u{2019}'], "'");
    let text = TRAILING_COMMA.replace_all(&text, "$1");
    let text = text.trim();

    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    first_json_span(text)
}

/// First `{...}` or `[...]` span that is valid JSON, string-aware
fn first_json_span(s: &str) -> Option<Value> {
    let mut in_string = false;
    let mut escaped = false;
    let mut stack: Vec<char> = Vec::new();
    let mut start = 0;

    for (i, ch) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' | '{' => {
                if stack.is_empty() {
                    start = i;
                }
                stack.push(ch);
            }
            ']' | '}' => {
                let opener = if ch == ']' { '[' } else { '{' };
                if stack.last() == Some(&opener) {
                    stack.pop();
                    if stack.is_empty() {
                        if let Ok(value) = serde_json::from_str(&s[start..=i]) {
                            return Some(value);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Terms from `return_terms` arguments; malformed items are dropped
pub fn terms_from_args(args: &Value) -> Vec<Term> {
    let Some(items) = args.get("terms").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let field = |name: &str| item.get(name)?.as_str().map(|s| s.trim().to_string());
            Some(Term {
                original: field("original")?,
                text: field("text")?,
                part_of_speech: field("partOfSpeech")?,
                meaning: field("meaning")?,
            })
        })
        .collect()
}

/// Dedupe on `text@@original`, case-insensitive
///
/// A repeated term keeps the position of its first occurrence and the
/// content of its last.
pub fn dedupe_terms(terms: Vec<Term>) -> Vec<Term> {
    let mut positions: std::collections::HashMap<String, usize> = Default::default();
    let mut out: Vec<Term> = Vec::new();

    for term in terms {
        let key = format!("{}@@{}", term.text, term.original).to_lowercase();
        match positions.get(&key) {
            Some(&at) => out[at] = term,
            None => {
                positions.insert(key, out.len());
                out.push(term);
            }
        }
    }
    out
}
