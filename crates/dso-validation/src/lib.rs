//! DSO Validation
//!
//! Pure checks over a session snapshot. Nothing here mutates a session;
//! callers decide what to do with the returned violations.
//!
//! # Core Concepts
//!
//! - [`ConstraintValidator`]: (session, exiting phase) → ordered violations
//! - [`ConsistencyEnforcer`]: full history → items that silently disappeared
//! - [`ReferenceIndex`]: which tracked ids each history record mentions
//! - [`CoverageReport`]: requirement coverage recomputed from scratch
//!
//! # Example
//!
//! ```rust,ignore
//! use dso_validation::{ConsistencyEnforcer, ConstraintValidator, ReferenceIndex};
//!
//! let refs = ReferenceIndex::build(&session);
//! let mut violations = ConstraintValidator::new().validate_with(&session, session.current_phase, &refs);
//! violations.extend(ConsistencyEnforcer::new().check_with(&session, &refs));
//! let blocked = violations.iter().any(|v| v.is_blocking());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod consistency;
mod coverage;
mod references;
mod validator;

pub use consistency::{ConsistencyEnforcer, DROPPED_REQUIREMENT, DROPPED_RISK};
pub use coverage::{compute_coverage, CoverageReport, COVERAGE_THRESHOLD};
pub use references::{MentionMatcher, ReferenceIndex};
pub use validator::ConstraintValidator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
