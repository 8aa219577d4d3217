//! Lenient JSON recovery for model output, with a model-assisted repair pass.
//!
//! [`safe_json_parse`] tries, in order: the sanitized text, the contents of
//! a fenced code block, and then every balanced `{..}`/`[..]` fragment of
//! each. Each candidate is also tried without trailing commas, and a JSON
//! string holding JSON is unwrapped. When all of that fails the pipeline
//! asks the model once to rewrite its own output ([`repair_output`]).

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use sitebrief_shared::{NOT_FOUND, truncate_chars};

use crate::completion::{CompletionClient, CompletionRequest};
use crate::prompt::schema_text;

/// Model output attached to diagnostics is cut to this many characters.
pub const RAW_OUTPUT_LIMIT: usize = 2_000;

// ---------------------------------------------------------------------------
// Text cleanup
// ---------------------------------------------------------------------------

/// Strip a leading BOM, straighten curly quotes, and drop control
/// characters other than tab, newline and carriage return.
pub fn sanitize_json_text(text: &str) -> String {
    text.strip_prefix('\u{FEFF}')
        .unwrap_or(text)
        .chars()
        .filter_map(|c| match c {
            '\u{201C}' | '\u{201D}' => Some('"'),
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\t' | '\n' | '\r' => Some(c),
            c if c <= '\u{1F}' => None,
            c => Some(c),
        })
        .collect()
}

/// Contents of the first fenced code block, or `text` unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("valid regex")
    });

    FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|inner| !inner.is_empty())
        .unwrap_or(text)
}

/// Tracks whether a scan position is inside a double-quoted string.
#[derive(Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Feed one character; returns true while it belongs to a string literal
    /// (including both quotes).
    fn consume(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return true;
        }
        if c == '"' {
            self.in_string = true;
            return true;
        }
        false
    }
}

/// Remove commas that directly precede `}` or `]`, leaving string contents
/// untouched.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();

    for (i, &c) in chars.iter().enumerate() {
        if state.consume(c) {
            out.push(c);
            continue;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }

    out
}

/// Every top-level balanced `{..}` or `[..]` span, in order of appearance.
///
/// Brackets inside string literals are ignored. A mismatched closer
/// abandons the fragment being scanned.
pub fn extract_json_fragments(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut start = None;
    let mut state = StringState::default();

    for (i, c) in text.char_indices() {
        if state.consume(c) {
            continue;
        }
        match c {
            '{' | '[' => {
                if stack.is_empty() {
                    start = Some(i);
                }
                stack.push(c);
            }
            '}' | ']' => {
                let Some(&open) = stack.last() else { continue };
                if (open == '{' && c != '}') || (open == '[' && c != ']') {
                    stack.clear();
                    start = None;
                    continue;
                }
                stack.pop();
                if stack.is_empty() {
                    if let Some(s) = start.take() {
                        fragments.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    fragments
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn is_structured(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Parse one candidate, with trailing-comma removal and unwrapping of
/// double-encoded JSON.
fn parse_candidate(candidate: &str) -> Option<Value> {
    let cleaned = sanitize_json_text(candidate);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_commas = strip_trailing_commas(trimmed);
    let attempts = if without_commas == trimmed {
        vec![trimmed]
    } else {
        vec![trimmed, without_commas.as_str()]
    };

    for attempt in attempts {
        if let Ok(parsed) = serde_json::from_str::<Value>(attempt) {
            if let Value::String(inner) = &parsed {
                if let Some(nested) = parse_candidate(inner).filter(is_structured) {
                    return Some(nested);
                }
            }
            return Some(parsed);
        }
    }

    None
}

/// Recover a JSON object or array from model output, or `None`.
///
/// Embedded fragments that parse to an object win over earlier array
/// fragments; an array fragment is returned only when no object follows.
pub fn safe_json_parse(text: &str) -> Option<Value> {
    let base = sanitize_json_text(text);
    let base = base.trim();
    if base.is_empty() {
        return None;
    }

    let mut seen: Vec<&str> = Vec::with_capacity(2);
    let mut first_array: Option<Value> = None;
    for candidate in [base, strip_code_fence(base)] {
        let candidate = candidate.trim();
        if candidate.is_empty() || seen.contains(&candidate) {
            continue;
        }
        seen.push(candidate);

        if let Some(value) = parse_candidate(candidate).filter(is_structured) {
            return Some(value);
        }
        for fragment in extract_json_fragments(candidate) {
            match parse_candidate(fragment) {
                Some(value @ Value::Object(_)) => return Some(value),
                Some(value @ Value::Array(_)) if first_array.is_none() => {
                    first_array = Some(value);
                }
                _ => {}
            }
        }
    }

    first_array
}

/// What to do with a completion's text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseDecision {
    /// A JSON object was recovered.
    Accepted(Map<String, Value>),
    /// Nothing usable; one repair pass is required.
    NeedsRepair,
}

/// Decide whether `text` yields a brief object as-is.
pub fn decide(text: &str) -> ParseDecision {
    match safe_json_parse(text) {
        Some(Value::Object(map)) => ParseDecision::Accepted(map),
        _ => ParseDecision::NeedsRepair,
    }
}

// ---------------------------------------------------------------------------
// Model-assisted repair
// ---------------------------------------------------------------------------

/// Limits for the single repair call.
#[derive(Debug, Clone, Copy)]
pub struct RepairSettings {
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

/// Prompt asking the model to turn `raw` into schema-shaped JSON.
pub fn build_repair_prompt(raw: &str) -> String {
    format!(
        "You repair malformed JSON.\n\
         Rewrite the text below as a single valid JSON object matching the schema.\n\
         Keep every existing value. Use \"{NOT_FOUND}\" for missing strings and [] for missing arrays.\n\
         Return ONLY valid JSON. No markdown, no commentary.\n\n\
         JSON schema (types only):\n{}\n\n\
         Malformed text:\n{raw}",
        schema_text()
    )
}

/// Run the one repair pass. There is no further fallback.
///
/// On failure the returned diagnostics describe why the repair did not
/// produce an object.
#[instrument(skip_all, fields(raw_chars = raw.len()))]
pub async fn repair_output(
    client: &CompletionClient,
    raw: &str,
    settings: RepairSettings,
) -> Result<Map<String, Value>, Value> {
    warn!("model output was not valid JSON, attempting repair");

    let prompt = build_repair_prompt(raw);
    let request = CompletionRequest {
        prompt: &prompt,
        max_tokens: settings.max_tokens,
        temperature: 0.0,
        timeout_ms: settings.timeout_ms,
    };

    let completion = match client.complete(request).await {
        Ok(completion) => completion,
        Err(e) => {
            warn!(error = %e, "repair request failed");
            return Err(json!({
                "attempted": true,
                "error": "Repair request failed.",
                "detail": e.to_body(),
            }));
        }
    };

    match decide(&completion.text) {
        ParseDecision::Accepted(map) => {
            info!(fields = map.len(), "repair produced valid JSON");
            Ok(map)
        }
        ParseDecision::NeedsRepair => {
            warn!("repair output was not valid JSON");
            Err(json!({
                "attempted": true,
                "error": "Repair output was not valid JSON.",
                "raw": truncate_chars(&completion.text, RAW_OUTPUT_LIMIT),
                "stop_reason": completion.stop_reason,
            }))
        }
    }
}
