//! Best-effort structured decoding of model output
//!
//! Models often wrap JSON in markdown code fences or surround it with prose.
//! These helpers strip fences, locate the first top-level JSON array and
//! decode it. [`decode_insights_or_default`] is what the advisor calls for
//! each candidate reply; it never fails, and anything it cannot decode
//! becomes an empty list.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Insight;

/// Number of insights a generation must produce
pub const INSIGHT_COUNT: usize = 4;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?").expect("valid regex"))
}

/// Remove markdown code fence markers, keeping the fenced content
pub fn strip_code_fences(text: &str) -> String {
    fence_regex().replace_all(text, "").trim().to_string()
}

/// Find the first balanced top-level `[...]` in `text`
///
/// Brackets inside JSON strings are ignored. If no balanced array exists,
/// falls back to the span from the first `[` to the last `]`.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode exactly [`INSIGHT_COUNT`] well-typed insights from model output
pub fn parse_insights(response: &str) -> Result<Vec<Insight>> {
    let cleaned = strip_code_fences(response);
    let json_str = extract_json_array(&cleaned).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON array found in AI response | Raw: {}",
            truncate(&cleaned, 200)
        ))
    })?;

    let insights: Vec<Insight> = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid insights JSON from AI: {} | Raw: {}",
            e,
            truncate(json_str, 200)
        ))
    })?;

    if insights.len() != INSIGHT_COUNT {
        return Err(Error::InvalidData(format!(
            "Expected {} insights, got {}",
            INSIGHT_COUNT,
            insights.len()
        )));
    }

    Ok(insights)
}

/// Like [`parse_insights`], but falls back to an empty list
pub fn decode_insights_or_default(response: &str) -> Vec<Insight> {
    match parse_insights(response) {
        Ok(insights) => insights,
        Err(e) => {
            warn!(error = %e, "Discarding undecodable insights");
            Vec::new()
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
