//! Parsing of single-document (non-streamed) backend output.

use serde_json::Value;

/// Extracts the answer text from one-shot output.
///
/// Priority: a string `result`, then the text blocks of a `content` array,
/// then a string `text`. A JSON document with none of these is returned
/// re-serialized; anything that is not JSON is returned verbatim.
pub fn parse_one_shot(stdout: &str) -> String {
    let trimmed = stdout.trim();
    let Ok(document) = serde_json::from_str::<Value>(trimmed) else {
        return stdout.to_string();
    };
    if let Some(result) = document.get("result").and_then(Value::as_str) {
        return result.to_string();
    }
    if let Some(blocks) = document.get("content").and_then(Value::as_array) {
        return blocks
            .iter()
            .filter_map(block_text)
            .collect::<Vec<_>>()
            .join("\n");
    }
    if let Some(text) = document.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    document.to_string()
}

fn block_text(block: &Value) -> Option<&str> {
    match block {
        Value::String(text) => Some(text),
        Value::Object(_) => {
            let kind = block.get("type").and_then(Value::as_str);
            if kind.is_some_and(|k| k != "text") {
                return None;
            }
            block.get("text").and_then(Value::as_str)
        }
        _ => None,
    }
}

/// One-shot session id (`session_id` on the document), when present.
pub fn one_shot_session_id(stdout: &str) -> Option<String> {
    serde_json::from_str::<Value>(stdout.trim())
        .ok()?
        .get("session_id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_owned)
}
