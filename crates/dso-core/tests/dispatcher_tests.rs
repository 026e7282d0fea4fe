//! JSON request/response handling and durable restore

use dso_core::{
    Action, Dispatcher, OrchestratorConfig, Phase, PersistenceConfig, Request, ResponseStatus,
    SessionManager, SessionStatus,
};
use dso_test_utils::{complete_session, start, walk_to};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(SessionManager::in_memory()))
}

fn call(d: &Dispatcher, request: &Value) -> Value {
    serde_json::to_value(d.handle_line(&request.to_string())).unwrap()
}

#[test]
fn test_wire_walkthrough() {
    let d = dispatcher();

    let started = call(
        &d,
        &json!({
            "action": "start-session",
            "sessionId": "s1",
            "config": {
                "goal": "payments",
                "requirements": ["R1", {"id": "R2", "description": "refunds within a day"}],
                "constraints": [{"id": "cov", "phase": "Discovery", "rule": {"type": "min_coverage", "percent": 100.0}}]
            }
        }),
    );
    assert_eq!(started["status"], "ok");
    assert_eq!(started["session"]["currentPhase"], "Discovery");
    assert_eq!(started["session"]["coverage"], json!({}));
    assert!(started.get("error").is_none());

    let held = call(
        &d,
        &json!({"action": "advance-phase", "sessionId": "s1", "phaseContentRefs": ["R1 notes"]}),
    );
    assert_eq!(held["status"], "blocked");
    assert_eq!(held["transition"]["type"], "held");
    assert_eq!(held["session"]["currentPhase"], "Discovery");

    let validated = call(&d, &json!({"action": "validate-phase", "sessionId": "s1"}));
    assert_eq!(validated["status"], "blocked");
    // validation is read-only
    assert_eq!(held["session"]["revision"], current_revision(&d));

    let coverage = call(
        &d,
        &json!({"action": "enforce-coverage", "sessionId": "s1", "threshold": 50.0}),
    );
    assert_eq!(coverage["status"], "ok");
    assert_eq!(coverage["coverage"]["requirements"], json!({"R1": true, "R2": false}));

    let advanced = call(
        &d,
        &json!({"action": "advance-phase", "sessionId": "s1", "phaseContent": {"refs": ["R2 refunds"], "requirements": ["R2"]}}),
    );
    assert_eq!(advanced["status"], "ok");
    assert_eq!(advanced["transition"], json!({"type": "advanced", "from": "Discovery", "to": "Analysis"}));

    let artifacts = call(
        &d,
        &json!({"action": "generate-artifacts", "sessionId": "s1", "kinds": ["roadmap", "specification"]}),
    );
    assert_eq!(artifacts["status"], "ok");
    assert_eq!(artifacts["artifacts"][0]["kind"], "roadmap");
    assert_eq!(artifacts["artifacts"][1]["kind"], "specification");
    assert_eq!(artifacts["artifacts"][0]["format"], "dso.document.v1");

    let listed = call(&d, &json!({"action": "list-sessions"}));
    assert_eq!(listed["sessions"][0]["id"], "s1");

    let aborted = call(
        &d,
        &json!({"action": "abort-session", "sessionId": "s1", "reason": "descoped"}),
    );
    assert_eq!(aborted["session"]["status"], "aborted");
}

fn current_revision(d: &Dispatcher) -> Value {
    call(d, &json!({"action": "get-status", "sessionId": "s1"}))["session"]["revision"].clone()
}

#[test]
fn test_error_codes_on_the_wire() {
    let d = dispatcher();
    call(&d, &json!({"action": "start-session", "sessionId": "dup"}));

    let cases = [
        (json!({"action": "start-session", "sessionId": "dup"}), "duplicate_session"),
        (json!({"action": "get-status", "sessionId": "nope"}), "not_found"),
        (json!({"action": "get-status"}), "bad_request"),
        (json!({"action": "revisit-phase", "sessionId": "dup"}), "bad_request"),
        (json!({"action": "revisit-phase", "sessionId": "dup", "phase": "Design"}), "invalid_transition"),
        (json!({"action": "generate-artifacts", "sessionId": "dup", "kinds": ["poster"]}), "configuration"),
        (json!({"action": "revisit-phase", "sessionId": "dup", "phase": "later"}), "configuration"),
        (json!({"action": "generate-artifacts", "sessionId": "dup", "kinds": [7]}), "bad_request"),
        (json!({"action": "enforce-coverage", "sessionId": "dup", "threshold": 140.0}), "configuration"),
        (
            json!({"action": "start-session", "sessionId": "bad", "config": {"requirements": ["R1", "R1"]}}),
            "configuration",
        ),
    ];
    for (request, code) in cases {
        let response = call(&d, &request);
        assert_eq!(response["status"], "error", "{request}");
        assert_eq!(response["error"]["code"], code, "{request}");
    }
}

#[test]
fn test_kind_aliases_render() {
    let d = dispatcher();
    call(&d, &json!({"action": "start-session", "sessionId": "s"}));
    let response = call(
        &d,
        &json!({"action": "generate-artifacts", "sessionId": "s", "kinds": ["spec"]}),
    );
    assert_eq!(response["status"], "ok");
    assert_eq!(response["artifacts"].as_array().unwrap().len(), 1);
    assert_eq!(response["artifacts"][0]["kind"], "specification");
}

#[test]
fn test_revisit_accepts_phase_names_in_any_case() {
    let d = Dispatcher::new(Arc::new(SessionManager::in_memory()));
    start(d.manager(), "s");
    walk_to(d.manager(), "s", Phase::Design);

    let response = call(
        &d,
        &json!({"action": "revisit-phase", "sessionId": "s", "phase": "discovery", "phaseContentRefs": ["R2 follow-up"]}),
    );
    assert_eq!(response["status"], "ok");
    assert_eq!(response["session"]["currentPhase"], "Design");

    let typed = d.handle(
        Request::new(Action::RevisitPhase)
            .for_session("s")
            .with_phase(Phase::Analysis),
    );
    assert_eq!(typed.status, ResponseStatus::Ok);
}

#[test]
fn test_unregistered_kind_is_configuration_error() {
    let manager = SessionManager::in_memory().with_registry(dso_core::ArtifactRegistry::new());
    let d = Dispatcher::new(Arc::new(manager));
    call(&d, &json!({"action": "start-session", "sessionId": "s"}));
    let response = call(
        &d,
        &json!({"action": "generate-artifacts", "sessionId": "s", "kinds": ["adr"]}),
    );
    assert_eq!(response["error"]["code"], "configuration");
}

#[test]
fn test_json_dir_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = OrchestratorConfig::new().with_persistence(PersistenceConfig::JsonDir {
        path: dir.path().join("sessions"),
    });

    let completed = {
        let manager = SessionManager::new(config.clone()).unwrap();
        start(&manager, "durable");
        complete_session(&manager, "durable");
        start(&manager, "evicted");
        manager.evict_session("evicted").unwrap();
        manager.get_status("durable").unwrap()
    };

    let manager = SessionManager::new(config).unwrap();
    assert_eq!(manager.session_count(), 1);
    let restored = manager.get_status("durable").unwrap();
    assert_eq!(restored, completed);
    assert_eq!(restored.status, SessionStatus::Completed);
    assert!(!dir.path().join("sessions").join("evicted.json").exists());

    let response = Dispatcher::new(Arc::new(manager))
        .handle_line(r#"{"action":"get-status","sessionId":"durable"}"#);
    assert_eq!(response.status, ResponseStatus::Ok);
}

#[test]
fn test_restart_skips_stray_session_files() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = dir.path().join("sessions");
    let config = OrchestratorConfig::new().with_persistence(PersistenceConfig::JsonDir {
        path: sessions.clone(),
    });

    {
        let manager = SessionManager::new(config.clone()).unwrap();
        start(&manager, "good");
    }
    std::fs::write(sessions.join("stray.json"), "{truncated").unwrap();
    std::fs::copy(sessions.join("good.json"), sessions.join("other.json")).unwrap();

    let manager = SessionManager::new(config).unwrap();
    assert_eq!(manager.session_count(), 1);
    assert_eq!(manager.get_status("good").unwrap().id, "good");
    assert_eq!(manager.get_status("other").unwrap_err().code(), "not_found");
    assert_eq!(manager.get_status("stray").unwrap_err().code(), "not_found");
    // skipped files are left for the operator
    assert!(sessions.join("stray.json").exists());
}
