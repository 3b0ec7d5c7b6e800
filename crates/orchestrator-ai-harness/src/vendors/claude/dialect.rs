use serde_json::Value;

use crate::dialect::{Dialect, Divergence, LiveUnits, Reduction};
use crate::event::Event;

/// Claude `stream-json` events the harness cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaudeEvent<'a> {
    /// `{"type":"system","session_id":..}` announcement.
    System,
    /// Assistant message. `text` comes from text content blocks, `plain`
    /// from a bare string `content`.
    Assistant {
        text: Option<String>,
        plain: Option<&'a str>,
    },
    /// Tool output fed back to the model; closes the current message group.
    ToolResult,
    /// User turn (tool results are wrapped in these); closes the group.
    User,
    /// Terminal event.
    Result {
        result: Option<&'a str>,
        session_id: Option<&'a str>,
    },
    /// Anything else.
    Other,
}

impl<'a> ClaudeEvent<'a> {
    pub fn classify(event: &'a Event) -> Self {
        match event.event_type() {
            Some("system") => Self::System,
            Some("assistant") => Self::Assistant {
                text: assistant_text(event),
                plain: plain_content(event),
            },
            Some("tool_result") => Self::ToolResult,
            Some("user") => Self::User,
            Some("result") => Self::Result {
                result: event.str_field("result"),
                session_id: event.session_id(),
            },
            _ => Self::Other,
        }
    }

    fn is_group_boundary(&self) -> bool {
        matches!(self, Self::ToolResult | Self::User)
    }

    /// Text the reducer accumulates for this event.
    fn group_text(&self) -> Option<&str> {
        match self {
            Self::Assistant { text: Some(text), .. } => Some(text.as_str()),
            Self::Assistant { text: None, plain } => plain.filter(|p| !p.is_empty()),
            _ => None,
        }
    }
}

/// Joined text of the `text` blocks in `message.content`.
fn assistant_text(event: &Event) -> Option<String> {
    if event.event_type() != Some("assistant") {
        return None;
    }
    let blocks = event
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array)?;
    let texts: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        return None;
    }
    Some(texts.join("\n")).filter(|text| !text.is_empty())
}

fn plain_content(event: &Event) -> Option<&str> {
    event
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .or_else(|| event.str_field("content"))
}

/// Event grammar of `claude -p --output-format stream-json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClaudeDialect;

impl Dialect for ClaudeDialect {
    fn name(&self) -> &'static str {
        "claude-stream-json"
    }

    fn extract_text(&self, event: &Event) -> Option<String> {
        assistant_text(event)
    }

    fn live_units(&self) -> Box<dyn LiveUnits> {
        Box::new(ClaudeGroups::default())
    }

    fn reduce(&self, events: &[Event]) -> Reduction {
        let mut session_id: Option<&str> = None;
        let mut terminal_session: Option<&str> = None;
        let mut terminal_result: Option<&str> = None;
        let mut groups: Vec<String> = Vec::new();
        let mut current = String::new();

        for event in events {
            let classified = ClaudeEvent::classify(event);
            match &classified {
                ClaudeEvent::Result {
                    result,
                    session_id: id,
                } => {
                    if result.is_some() {
                        terminal_result = *result;
                    }
                    if id.is_some() {
                        terminal_session = *id;
                    }
                }
                // Assistant and user events carry the id too.
                _ => {
                    if session_id.is_none() {
                        session_id = event.session_id();
                    }
                }
            }
            if let Some(text) = classified.group_text() {
                current = text.to_string();
            } else if classified.is_group_boundary() && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }

        let session_id = terminal_session.or(session_id).map(str::to_owned);
        let accumulated = groups.join("\n");
        if groups.len() > 1 {
            // The terminal result only mirrors the last group.
            return Reduction::new(accumulated, session_id);
        }
        match terminal_result.filter(|r| !r.is_empty()) {
            Some(terminal) => {
                let mut reduction = Reduction::new(terminal.to_string(), session_id);
                if !accumulated.is_empty() && accumulated.trim() != terminal.trim() {
                    reduction.divergence = Some(Divergence {
                        terminal: terminal.to_string(),
                        accumulated,
                    });
                }
                reduction
            }
            None => Reduction::new(accumulated, session_id),
        }
    }
}

/// Live keyer that numbers message groups the same way the reducer closes them.
#[derive(Debug, Default)]
struct ClaudeGroups {
    index: usize,
    open_group_has_text: bool,
}

impl LiveUnits for ClaudeGroups {
    fn unit_for(&mut self, event: &Event, has_text: bool) -> Option<String> {
        if ClaudeEvent::classify(event).is_group_boundary() {
            if self.open_group_has_text {
                self.index += 1;
                self.open_group_has_text = false;
            }
            return None;
        }
        if !has_text {
            return None;
        }
        self.open_group_has_text = true;
        Some(format!("group-{}", self.index))
    }
}
