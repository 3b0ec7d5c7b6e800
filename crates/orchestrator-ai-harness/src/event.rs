//! Backend-agnostic view of one decoded output line.

use serde_json::{Map, Value};
use tracing::trace;

/// One JSON object decoded from a backend's line-delimited output.
///
/// Only objects are representable; scalars, arrays and invalid JSON are
/// discarded at decode time and never surface as events.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    /// Wraps a decoded JSON value, rejecting anything that is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Decodes a single line. Blank lines and undecodable lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => {
                let event = Self::from_value(value);
                if event.is_none() {
                    trace!(line = %preview(trimmed), "skipping non-object JSON line");
                }
                event
            }
            Err(err) => {
                trace!(line = %preview(trimmed), error = %err, "skipping undecodable line");
                None
            }
        }
    }

    /// The `type` discriminator, when present and a string.
    pub fn event_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A top-level string field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// A non-empty generic `session_id` field.
    pub fn session_id(&self) -> Option<&str> {
        self.str_field("session_id").filter(|id| !id.trim().is_empty())
    }
}

fn preview(line: &str) -> String {
    const MAX: usize = 80;
    if line.chars().count() <= MAX {
        return line.to_string();
    }
    let head: String = line.chars().take(MAX).collect();
    format!("{head}...")
}
