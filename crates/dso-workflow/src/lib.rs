//! DSO Workflow
//!
//! The phase state machine. Every operation here is a pure computation:
//! it takes a session snapshot and returns the next state, leaving the
//! caller to commit it atomically.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dso_workflow::{PhaseWorkflow, Transition};
//!
//! let workflow = PhaseWorkflow::new();
//! let outcome = workflow.advance(&session, Some(content), chrono::Utc::now())?;
//! match outcome.transition {
//!     Transition::Advanced { to, .. } => println!("now in {to}"),
//!     Transition::Held { .. } | Transition::Blocked { .. } => println!("{:?}", outcome.violations),
//!     _ => {}
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod state;
pub mod workflow;

pub use error::WorkflowError;
pub use state::{allowed_transitions, validate_transition, WorkflowState};
pub use workflow::{
    AbortOutcome, AdvanceOutcome, GateReport, PhaseWorkflow, Transition,
    DEFAULT_MAX_BLOCKED_ATTEMPTS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
