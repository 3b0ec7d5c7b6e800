//! Strategy seam for backend event vocabularies.
//!
//! Each backend family speaks its own line-delimited JSON grammar. A
//! [`Dialect`] bundles the three consumers of that grammar: the per-event
//! text extractor, the live unit keyer that feeds the delta emitter, and the
//! reducer that folds a whole event list into the authoritative result.

use crate::event::Event;

/// Final fold of one call's event stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reduction {
    pub response_text: String,
    pub session_id: Option<String>,
    /// True when at least some assistant text was recovered.
    pub extraction_succeeded: bool,
    /// Set when a terminal result field won over different accumulated text.
    pub divergence: Option<Divergence>,
}

impl Reduction {
    pub(crate) fn new(response_text: String, session_id: Option<String>) -> Self {
        let extraction_succeeded = !response_text.is_empty();
        Self {
            response_text,
            session_id,
            extraction_succeeded,
            divergence: None,
        }
    }
}

/// Two candidate final texts that disagreed; the terminal one was returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Divergence {
    pub terminal: String,
    pub accumulated: String,
}

/// Replacement text for one logical unit, as seen while streaming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitUpdate {
    pub unit_id: String,
    pub text: String,
}

/// Assigns extracted text to logical units. One instance per call.
///
/// Sees every event in order, with or without text, so it can track
/// boundaries between units.
pub trait LiveUnits: Send {
    /// Unit that the extracted text of `event` belongs to, or `None` when
    /// the text has no stable unit and must not be shown.
    fn unit_for(&mut self, event: &Event, has_text: bool) -> Option<String>;
}

/// One backend's event grammar.
pub trait Dialect: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Text carried by a single event, or `None`.
    fn extract_text(&self, event: &Event) -> Option<String>;

    /// Fresh live keyer for a new call.
    fn live_units(&self) -> Box<dyn LiveUnits>;

    /// Folds an ordered event list into the final response and session id.
    fn reduce(&self, events: &[Event]) -> Reduction;
}

/// Per-event live path: the dialect's extractor, then its unit keyer.
pub struct LiveText<'d> {
    dialect: &'d dyn Dialect,
    units: Box<dyn LiveUnits>,
}

impl<'d> LiveText<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            units: dialect.live_units(),
        }
    }

    pub fn observe(&mut self, event: &Event) -> Option<UnitUpdate> {
        let text = self.dialect.extract_text(event);
        let unit_id = self.units.unit_for(event, text.is_some())?;
        Some(UnitUpdate {
            unit_id,
            text: text?,
        })
    }
}
