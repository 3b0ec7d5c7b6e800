use std::collections::HashMap;

use serde_json::Value;

use crate::dialect::{Dialect, LiveUnits, Reduction};
use crate::event::Event;

const AGENT_MESSAGE: &str = "agent_message";

/// Lifecycle stage of a Codex item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemPhase {
    Started,
    Updated,
    Completed,
}

/// Codex `exec --json` events the harness cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodexEvent<'a> {
    /// `{"type":"thread.started","thread_id":..}`.
    ThreadStarted { thread_id: Option<&'a str> },
    /// `item.started` / `item.updated` / `item.completed`.
    Item {
        phase: ItemPhase,
        id: Option<&'a str>,
        kind: Option<&'a str>,
        text: Option<&'a str>,
    },
    /// Anything else; may still carry a generic session id.
    Other { session_id: Option<&'a str> },
}

impl<'a> CodexEvent<'a> {
    pub fn classify(event: &'a Event) -> Self {
        let phase = match event.event_type() {
            Some("thread.started") => {
                return Self::ThreadStarted {
                    thread_id: event.str_field("thread_id").filter(|id| !id.trim().is_empty()),
                };
            }
            Some("item.started") => ItemPhase::Started,
            Some("item.updated") => ItemPhase::Updated,
            Some("item.completed") => ItemPhase::Completed,
            _ => {
                return Self::Other {
                    session_id: event.session_id(),
                };
            }
        };
        let item = event.get("item");
        let field = |key: &str| item.and_then(|i| i.get(key)).and_then(Value::as_str);
        Self::Item {
            phase,
            id: field("id").filter(|id| !id.is_empty()),
            kind: field("type"),
            text: field("text"),
        }
    }

    /// Non-empty agent message text, regardless of id.
    fn agent_text(&self) -> Option<&'a str> {
        match self {
            Self::Item {
                kind: Some(AGENT_MESSAGE),
                text: Some(text),
                ..
            } if !text.is_empty() => Some(*text),
            _ => None,
        }
    }
}

/// Event grammar of `codex exec --json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodexDialect;

#[derive(Default)]
struct ItemTexts {
    completed: Option<String>,
    latest: Option<String>,
}

impl Dialect for CodexDialect {
    fn name(&self) -> &'static str {
        "codex-exec-json"
    }

    fn extract_text(&self, event: &Event) -> Option<String> {
        CodexEvent::classify(event).agent_text().map(str::to_owned)
    }

    fn live_units(&self) -> Box<dyn LiveUnits> {
        Box::new(CodexItems)
    }

    fn reduce(&self, events: &[Event]) -> Reduction {
        let mut thread_id: Option<&str> = None;
        let mut generic_session: Option<&str> = None;
        let mut order: Vec<&str> = Vec::new();
        let mut items: HashMap<&str, ItemTexts> = HashMap::new();

        for event in events {
            let classified = CodexEvent::classify(event);
            if generic_session.is_none() {
                generic_session = event.session_id();
            }
            match classified {
                CodexEvent::ThreadStarted { thread_id: id } => {
                    if thread_id.is_none() {
                        thread_id = id;
                    }
                }
                CodexEvent::Item {
                    phase,
                    id: Some(id),
                    kind: Some(AGENT_MESSAGE),
                    text,
                } => {
                    let entry = items.entry(id).or_insert_with(|| {
                        order.push(id);
                        ItemTexts::default()
                    });
                    let Some(text) = text.filter(|t| !t.is_empty()) else {
                        continue;
                    };
                    match phase {
                        ItemPhase::Completed => entry.completed = Some(text.to_string()),
                        ItemPhase::Started | ItemPhase::Updated => {
                            entry.latest = Some(text.to_string())
                        }
                    }
                }
                _ => {}
            }
        }

        let response_text = order
            .iter()
            .filter_map(|id| items.get(id))
            .filter_map(|texts| texts.completed.as_deref().or(texts.latest.as_deref()))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let session_id = thread_id.or(generic_session).map(str::to_owned);
        Reduction::new(response_text, session_id)
    }
}

/// Live keyer: units are Codex item ids. Items without an id are ignored.
struct CodexItems;

impl LiveUnits for CodexItems {
    fn unit_for(&mut self, event: &Event, has_text: bool) -> Option<String> {
        if !has_text {
            return None;
        }
        match CodexEvent::classify(event) {
            CodexEvent::Item { id: Some(id), .. } => Some(id.to_string()),
            _ => None,
        }
    }
}
