//! DSO Core - Session Manager
//!
//! The orchestrator's public surface:
//! - Creates sessions and drives them through the phase workflow
//! - Serializes mutations per session while reads run concurrently
//! - Persists every committed snapshot before it becomes visible
//! - Dispatches named JSON actions onto manager operations
//!
//! # Example
//!
//! ```rust,ignore
//! use dso_core::{SessionManager, PhaseContent, SessionConfig};
//!
//! let manager = SessionManager::in_memory();
//! manager.start_session(Some("s1".into()), SessionConfig::new().with_requirements(["R1"]))?;
//!
//! let outcome = manager.advance_phase("s1", Some(PhaseContent::new().with_ref("R1 interview")))?;
//! println!("{}", outcome.transition);
//! # Ok::<(), dso_core::DsoError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod manager;
pub mod persistence;
pub mod store;

pub use config::{OrchestratorConfig, PersistenceConfig};
pub use dispatcher::{Action, ContentInput, Dispatcher, ErrorBody, Request, Response, ResponseStatus};
pub use error::{DsoError, PersistenceError};
pub use logging::{init_tracing, LOG_ENV};
pub use manager::SessionManager;
pub use persistence::{from_config, InMemoryPersistence, JsonDirPersistence, SessionPersistence};
pub use store::{SessionHandle, SessionStore};

pub use dso_artifacts::{Artifact, ArtifactRegistry};
pub use dso_model::{ArtifactKind, Phase, PhaseContent, Session, SessionConfig, SessionStatus};
pub use dso_validation::CoverageReport;
pub use dso_workflow::{AdvanceOutcome, Transition};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving sessions
    pub use crate::{
        Action, ArtifactKind, Dispatcher, DsoError, OrchestratorConfig, Phase, PhaseContent,
        Request, Response, SessionConfig, SessionManager, SessionStatus, Transition,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
