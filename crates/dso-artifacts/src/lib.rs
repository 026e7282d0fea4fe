//! DSO Artifacts
//!
//! Projects a session snapshot into structured, format-agnostic documents.
//! One [`ArtifactStrategy`] per [`ArtifactKind`](dso_model::ArtifactKind),
//! selected through an [`ArtifactRegistry`] populated at startup.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dso_artifacts::ArtifactRegistry;
//! use dso_model::ArtifactKind;
//!
//! let registry = ArtifactRegistry::with_defaults();
//! let artifacts = registry.generate(&session, &[ArtifactKind::Adr], chrono::Utc::now())?;
//! assert_eq!(artifacts[0].kind, ArtifactKind::Adr);
//! ```
//!
//! Rendering never touches the session. Recording what was generated is
//! the caller's job (see [`Artifact::record`]).

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod artifact;
pub mod document;
pub mod error;
pub mod registry;
pub mod strategies;
pub mod strategy;

pub use artifact::{Artifact, DOCUMENT_FORMAT};
pub use document::{Block, DocumentPayload, Section};
pub use error::ArtifactError;
pub use registry::ArtifactRegistry;
pub use strategies::{
    AdrStrategy, EnterpriseArchitectureStrategy, RoadmapStrategy, SpecificationStrategy,
};
pub use strategy::ArtifactStrategy;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
