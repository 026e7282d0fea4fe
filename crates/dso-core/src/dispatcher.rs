//! Request dispatcher
//!
//! Maps named actions onto [`SessionManager`] operations. Requests and
//! responses are plain camelCase JSON objects, one per line on the wire.
//!
//! ```json
//! {"action":"advance-phase","sessionId":"s1","phaseContent":{"refs":["R1 interview"]}}
//! {"status":"blocked","violations":[...],"transition":{"type":"held","phase":"Discovery","attempts":1}}
//! ```

use crate::error::DsoError;
use crate::manager::SessionManager;
use dso_artifacts::Artifact;
use dso_model::{ArtifactKind, Phase, PhaseContent, Session, SessionConfig, SessionSummary, Violation};
use dso_validation::CoverageReport;
use dso_workflow::Transition;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Named operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// `start-session`
    StartSession,
    /// `advance-phase`
    AdvancePhase,
    /// `validate-phase`
    ValidatePhase,
    /// `generate-artifacts`
    GenerateArtifacts,
    /// `enforce-coverage`
    EnforceCoverage,
    /// `get-status`
    GetStatus,
    /// `abort-session`
    AbortSession,
    /// `revisit-phase`
    RevisitPhase,
    /// `list-sessions`
    ListSessions,
    /// `evict-session`
    EvictSession,
}

/// Phase content as sent by callers: a bare list of refs or the full object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentInput {
    /// Opaque content refs only
    Refs(Vec<String>),
    /// Refs plus structured hints
    Structured(PhaseContent),
}

impl ContentInput {
    /// Normalize into [`PhaseContent`]
    #[must_use]
    pub fn into_content(self) -> PhaseContent {
        match self {
            ContentInput::Refs(refs) => PhaseContent {
                refs,
                ..PhaseContent::default()
            },
            ContentInput::Structured(content) => content,
        }
    }
}

/// Incoming request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Operation to run
    pub action: Action,
    /// Target session (optional for `start-session` and `list-sessions`)
    #[serde(default)]
    pub session_id: Option<String>,
    /// Session configuration for `start-session`
    #[serde(default)]
    pub config: Option<SessionConfig>,
    /// Content for `advance-phase` / `revisit-phase`
    #[serde(default, alias = "phaseContentRefs")]
    pub phase_content: Option<ContentInput>,
    /// Kind names for `generate-artifacts` (absent or empty: all)
    ///
    /// Parsed with [`ArtifactKind`]'s `FromStr`, so aliases such as `spec`
    /// work and unknown names are configuration errors.
    #[serde(default)]
    pub kinds: Option<Vec<String>>,
    /// Threshold override for `enforce-coverage`
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Target phase name for `revisit-phase` (case-insensitive)
    #[serde(default)]
    pub phase: Option<String>,
    /// Reason for `abort-session`
    #[serde(default)]
    pub reason: Option<String>,
}

impl Request {
    /// Bare request for `action`
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            session_id: None,
            config: None,
            phase_content: None,
            kinds: None,
            threshold: None,
            phase: None,
            reason: None,
        }
    }

    /// With target session
    #[inline]
    #[must_use]
    pub fn for_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// With phase content
    #[inline]
    #[must_use]
    pub fn with_content(mut self, content: PhaseContent) -> Self {
        self.phase_content = Some(ContentInput::Structured(content));
        self
    }

    /// With session configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// With artifact kinds
    #[must_use]
    pub fn with_kinds(mut self, kinds: &[ArtifactKind]) -> Self {
        self.kinds = Some(kinds.iter().map(ToString::to_string).collect());
        self
    }

    /// With target phase
    #[must_use]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase.to_string());
        self
    }

    fn parsed_kinds(&self) -> Result<Vec<ArtifactKind>, DsoError> {
        self.kinds
            .iter()
            .flatten()
            .map(|name| name.parse::<ArtifactKind>().map_err(DsoError::from))
            .collect()
    }

    fn require_session(&self) -> Result<&str, Response> {
        self.session_id
            .as_deref()
            .ok_or_else(|| Response::error("bad_request", "sessionId is required"))
    }
}

/// Outcome class of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Operation succeeded
    Ok,
    /// Operation ran but a gate rejected the session
    Blocked,
    /// Operation failed
    Error,
}

/// Error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Outgoing response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Outcome class
    pub status: ResponseStatus,
    /// Session snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// Violations found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
    /// Generated artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    /// Coverage report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageReport>,
    /// Session listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionSummary>>,
    /// What `advance-phase` did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    /// Failure details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn with_status(status: ResponseStatus) -> Self {
        Self {
            status,
            session: None,
            violations: None,
            artifacts: None,
            coverage: None,
            sessions: None,
            transition: None,
            error: None,
        }
    }

    fn ok() -> Self {
        Self::with_status(ResponseStatus::Ok)
    }

    fn gate(blocked: bool) -> Self {
        Self::with_status(if blocked {
            ResponseStatus::Blocked
        } else {
            ResponseStatus::Ok
        })
    }

    /// Error response with `code`
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
            ..Self::with_status(ResponseStatus::Error)
        }
    }

    /// Check if the response reports success
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

impl From<DsoError> for Response {
    fn from(err: DsoError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}

/// Routes requests to a shared manager
#[derive(Debug, Clone)]
pub struct Dispatcher {
    manager: Arc<SessionManager>,
}

impl Dispatcher {
    /// Create dispatcher over `manager`
    #[must_use]
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Underlying manager
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Handle one JSON-encoded request
    #[must_use]
    pub fn handle_line(&self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::debug!(error = %e, "malformed request");
                Response::error("bad_request", format!("malformed request: {e}"))
            }
        }
    }

    /// Handle one request
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        let action = request.action;
        match self.route(request) {
            Ok(response) | Err(response) => {
                if let Some(error) = &response.error {
                    tracing::debug!(?action, code = %error.code, message = %error.message, "request failed");
                }
                response
            }
        }
    }

    fn route(&self, request: Request) -> Result<Response, Response> {
        let manager = &self.manager;
        Ok(match request.action {
            Action::StartSession => {
                let session = manager.start_session(
                    request.session_id,
                    request.config.unwrap_or_default(),
                )?;
                Response {
                    session: Some(session),
                    ..Response::ok()
                }
            }
            Action::AdvancePhase => {
                let id = request.require_session()?;
                let content = request.phase_content.clone().map(ContentInput::into_content);
                let outcome = manager.advance_phase(id, content)?;
                Response {
                    transition: Some(outcome.transition),
                    violations: Some(outcome.violations),
                    session: Some(outcome.session),
                    ..Response::gate(outcome.transition.is_rejected())
                }
            }
            Action::ValidatePhase => {
                let violations = manager.validate_phase(request.require_session()?)?;
                Response::gate(violations.iter().any(Violation::is_blocking))
                    .with_violations(violations)
            }
            Action::GenerateArtifacts => {
                let kinds = request.parsed_kinds()?;
                let artifacts = manager.generate_artifacts(request.require_session()?, &kinds)?;
                Response {
                    artifacts: Some(artifacts),
                    ..Response::ok()
                }
            }
            Action::EnforceCoverage => {
                let report = manager.enforce_coverage(request.require_session()?, request.threshold)?;
                Response {
                    violations: Some(report.violations.clone()),
                    ..Response::gate(!report.meets_threshold())
                }
                .with_coverage(report)
            }
            Action::GetStatus => Response {
                session: Some(manager.get_status(request.require_session()?)?),
                ..Response::ok()
            },
            Action::AbortSession => {
                let id = request.require_session()?;
                Response {
                    session: Some(manager.abort_session(id, request.reason.clone())?),
                    ..Response::ok()
                }
            }
            Action::RevisitPhase => {
                let id = request.require_session()?;
                let phase = request
                    .phase
                    .as_deref()
                    .ok_or_else(|| Response::error("bad_request", "phase is required"))?
                    .parse::<Phase>()
                    .map_err(DsoError::from)?;
                let content = request
                    .phase_content
                    .clone()
                    .map(ContentInput::into_content)
                    .unwrap_or_default();
                Response {
                    session: Some(manager.revisit_phase(id, phase, content)?),
                    ..Response::ok()
                }
            }
            Action::ListSessions => Response {
                sessions: Some(manager.list_sessions()),
                ..Response::ok()
            },
            Action::EvictSession => Response {
                session: Some(manager.evict_session(request.require_session()?)?),
                ..Response::ok()
            },
        })
    }
}

impl Response {
    fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = Some(violations);
        self
    }

    fn with_coverage(mut self, report: CoverageReport) -> Self {
        self.coverage = Some(report);
        self
    }
}
