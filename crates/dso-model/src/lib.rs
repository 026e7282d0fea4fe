//! DSO Model
//!
//! Data model shared by every layer of the design session orchestrator.
//!
//! # Core Concepts
//!
//! - [`Session`]: A single design effort tracked through phases to completion
//! - [`Phase`]: One stage of the fixed Discovery → Documentation sequence
//! - [`Constraint`]: A blocking or advisory rule bound to a phase or the whole session
//! - [`Violation`]: The result of a constraint or consistency check failing
//! - [`PhaseContent`]: Opaque content refs plus the structured hints extracted from them
//! - [`ArtifactKind`]: Document families an artifact strategy can render
//!
//! # Example
//!
//! ```rust,ignore
//! use dso_model::{ConstraintSpec, Phase, Session, SessionConfig};
//!
//! let config = SessionConfig::new()
//!     .with_goal("Pick a storage engine")
//!     .with_requirements(["R1", "R2"])
//!     .with_constraint(ConstraintSpec::min_coverage("full-coverage", 100.0).for_phase(Phase::Discovery));
//!
//! let session = Session::new("s1", config, chrono::Utc::now())?;
//! assert_eq!(session.current_phase, Phase::Discovery);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod artifact_kind;
mod config;
mod constraint;
mod content;
mod error;
mod phase;
mod session;

pub use artifact_kind::ArtifactKind;
pub use config::{Requirement, RequirementSpec, SessionConfig};
pub use constraint::{
    BuiltinRule, Constraint, ConstraintRule, ConstraintSpec, RuleClass, Severity, ThresholdRule,
    Violation, ViolationSource,
};
pub use content::{Decision, Milestone, PhaseContent, Risk};
pub use error::ModelError;
pub use phase::{Phase, SessionStatus};
pub use session::{ArtifactRecord, PhaseRecord, RecordKind, Session, SessionSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
