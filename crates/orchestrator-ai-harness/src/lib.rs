//! Protocol layer for driving CLI coding assistants as subprocesses.
//!
//! Backends print line-delimited JSON. The harness decodes that stream
//! incrementally, pushes live text deltas to an optional sink, reduces the
//! full event list into a final answer plus conversation id, and keeps
//! per-role sessions continuous across calls.
//!
//! Backend-specific grammars and command lines live under `vendors::*`.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use orchestrator_ai_harness::prelude::*;
//! use orchestrator_ai_harness::vendors::claude::ClaudeCli;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let harness = Harness::builder()
//!     .register_backend(Arc::new(ClaudeCli::new()))
//!     .build()?;
//! let client = harness.client(&BackendId::new("claude"))?;
//!
//! let mut print = |chunk: &str| print!("{chunk}");
//! let result = client
//!     .run(
//!         CallRequest {
//!             prompt: "Say hello".into(),
//!             resume_session_id: None,
//!             hints: CallHints::new(Role::Generation, SandboxMode::ReadOnly),
//!         },
//!         Some(&mut print),
//!     )
//!     .await?;
//!
//! println!("\nsession: {:?}", result.session_id);
//! # Ok(())
//! # }
//! ```

/// Adapter contract turning calls into command lines.
pub mod backend;
/// Backend call wrapper and its result type.
pub mod call;
/// Live delta emission.
pub mod delta;
/// Per-backend event grammar seam.
pub mod dialect;
/// Public error types used by the harness API.
pub mod errors;
/// Decoded output events.
pub mod event;
/// Harness entry point and builder.
pub mod harness;
/// Chunk-boundary-safe line decoding.
pub mod line_buffer;
/// Backend and role identifiers plus call options.
pub mod model;
/// Single-document output parsing.
pub mod oneshot;
/// Common imports for typical usage.
pub mod prelude;
/// Backend availability checks.
pub mod probe;
/// Subprocess execution.
pub mod runner;
/// Per-role session continuity.
pub mod session;
/// Vendor-specific integrations.
pub mod vendors;

pub use backend::{BackendAdapter, CallRequest, CommandLine};
pub use call::{BackendCallResult, BackendClient};
pub use delta::{CollectingSink, DeltaEmitter, TextSink};
pub use dialect::{Dialect, Divergence, LiveText, LiveUnits, Reduction, UnitUpdate};
pub use errors::{HarnessError, TransportError};
pub use event::Event;
pub use harness::{Harness, HarnessBuilder};
pub use line_buffer::{LineBuffer, decode_all};
pub use model::{BackendId, BackendKind, CallHints, CallOptions, Continuity, Role, SandboxMode};
pub use probe::{BackendCapability, probe};
pub use runner::{
    OutputObserver, PassThrough, ProcessOutput, ProcessRunner, ProcessSpec, TokioProcessRunner,
};
pub use session::{
    PlannedCall, PriorSummaries, SessionContinuity, SessionSlot, SummaryEntry, SummaryKind,
};
