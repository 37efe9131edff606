//! # Code Execution
//!
//! Client side of a remote sandboxed execution service. Gates languages by
//! subscription tier, dispatches a single-file run to a Piston-compatible
//! runtime and normalizes its phase-separated response into one outcome.

mod client;
mod entitlement;
mod error;
mod languages;
mod orchestrator;
mod session;
mod types;

pub use client::{PistonClient, RuntimeClient, DEFAULT_RUNTIME_URL};
pub use entitlement::{Authorization, Entitlement, EntitlementGate, DENIED_REASON};
pub use error::Error;
pub use languages::LanguageTable;
pub use orchestrator::{
    classify, ExecutionOrchestrator, RunState, CANCELLED_ERROR, DEFAULT_TIMEOUT, NO_CODE_ERROR,
    TRANSPORT_ERROR,
};
pub use session::{EditorSession, SessionPreferences};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ExecutionOutcome, ExecutionStatus, Language, PhaseResult, RuntimeRequest, RuntimeResponse,
    RuntimeSpec, SourceFile,
};

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;
