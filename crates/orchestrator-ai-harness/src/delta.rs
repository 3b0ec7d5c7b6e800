use std::collections::HashMap;

/// Receiver of live text chunks. Invoked synchronously on the stdout path,
/// so implementations must not block.
pub trait TextSink: Send {
    fn receive(&mut self, chunk: &str);
}

impl<F> TextSink for F
where
    F: FnMut(&str) + Send,
{
    fn receive(&mut self, chunk: &str) {
        self(chunk)
    }
}

/// Collects every received chunk; handy for tests and for callers that want
/// the live transcript afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectingSink {
    pub chunks: Vec<String>,
}

impl CollectingSink {
    pub fn joined(&self) -> String {
        self.chunks.concat()
    }
}

impl TextSink for CollectingSink {
    fn receive(&mut self, chunk: &str) {
        self.chunks.push(chunk.to_string());
    }
}

/// Turns "current text per logical unit" updates into append-only deltas.
///
/// The cumulative text is the newline join of all non-empty unit texts in
/// first-appearance order. The cursor counts characters already emitted. When
/// the cumulative text shrinks below the cursor, the cursor resets and the
/// whole new text is emitted again; earlier output is never retracted.
#[derive(Debug, Default)]
pub struct DeltaEmitter {
    texts: HashMap<String, String>,
    order: Vec<String>,
    cursor: usize,
}

impl DeltaEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the text of `unit_id` and returns the newly visible suffix.
    pub fn update(&mut self, unit_id: &str, text: &str) -> Option<String> {
        match self.texts.get_mut(unit_id) {
            Some(current) => {
                current.clear();
                current.push_str(text);
            }
            None => {
                self.order.push(unit_id.to_string());
                self.texts.insert(unit_id.to_string(), text.to_string());
            }
        }

        let cumulative = self.cumulative();
        let length = cumulative.chars().count();
        if length < self.cursor {
            self.cursor = 0;
        }
        let delta: String = cumulative.chars().skip(self.cursor).collect();
        if delta.is_empty() {
            return None;
        }
        self.cursor = length;
        Some(delta)
    }

    /// Same as [`DeltaEmitter::update`], pushing the delta straight to `sink`.
    pub fn update_into(&mut self, unit_id: &str, text: &str, sink: &mut dyn TextSink) {
        if let Some(delta) = self.update(unit_id, text) {
            sink.receive(&delta);
        }
    }

    pub fn cumulative(&self) -> String {
        self.order
            .iter()
            .filter_map(|id| self.texts.get(id))
            .filter(|text| !text.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Characters of the cumulative text already emitted.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
