//! Common imports for typical harness usage.
pub use crate::{
    BackendCallResult, BackendClient, BackendId, BackendKind, CallHints, CallRequest, Harness,
    HarnessBuilder, HarnessError, PriorSummaries, Role, SandboxMode, SessionContinuity, TextSink,
};
