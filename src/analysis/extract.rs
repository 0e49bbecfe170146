//! Tolerant extraction of the result object from the model's free-text answer.
//!
//! The vision model is instructed to answer with a bare JSON object but often
//! wraps it in prose. [`extract_first_json_object`] slices out the first
//! top-level `{...}` span by brace-depth counting; [`decode_result`] then
//! decodes it strictly.
//!
//! Known limitation, kept deliberately: the scan does not special-case `{` or
//! `}` characters inside string literals, so a brace inside a quoted value can
//! truncate the span. The device-facing robustness boundary is unspecified, so
//! the naive behavior is preserved rather than silently hardened.

use crate::error::{Result, VisionError};
use crate::types::AnalysisResult;

/// Return the first top-level `{...}` span in `text`, or `None` when no
/// balanced object is present.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;

    for (i, ch) in text.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        let begin = start?;
                        return Some(&text[begin..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Strictly decode an extracted JSON object into [`AnalysisResult`].
///
/// Any missing or malformed field is an error; a partial result is never
/// produced.
pub fn decode_result(json: &str) -> Result<AnalysisResult> {
    serde_json::from_str(json)
        .map_err(|e| VisionError::decode("analysis result", e.to_string()))
}
