use super::*;
use crate::{
    router::route,
    session::Session,
    staging::FileMeta,
};
use shared::{
    domain::DocumentKind,
    protocol::FollowUpResponse,
};

fn state_with_uploads() -> ConversationState {
    let mut state = ConversationState::new();
    state
        .attach(FileMeta::from_bytes("invoice.csv", vec![b'x'; 10 * 1024]))
        .expect("csv");
    state
        .attach(FileMeta::from_bytes("scan.pdf", b"%PDF-1.4".to_vec()))
        .expect("pdf");
    state
}

fn roles(state: &ConversationState) -> Vec<Role> {
    state.log.iter().map(|m| m.role).collect()
}

#[test]
fn stateful_audit_activates_session_and_appends_summary_then_reply() {
    let mut state = state_with_uploads();
    let shape = route("summarize", &state.staging, &state.session);
    let before = state.log.len();

    let outcome = reconcile(
        &mut state,
        &shape,
        Ok(BackendReply::Audit(AuditResponse::with_session(
            "s1",
            "## Summary...",
            "What would you like to know?",
        ))),
    );

    assert_eq!(
        outcome,
        ReconcileOutcome::AuditStarted {
            session_id: SessionId::new("s1")
        }
    );
    assert_eq!(state.session, Session::Active(SessionId::new("s1")));
    assert!(state.staging.is_empty());
    let appended: Vec<_> = state.log.messages()[before..]
        .iter()
        .map(|m| (m.role, m.text.as_str()))
        .collect();
    assert_eq!(
        appended,
        vec![
            (Role::Assistant, "## Summary..."),
            (Role::Assistant, "What would you like to know?"),
        ]
    );
}

#[test]
fn stateless_reply_leaves_session_unset_and_still_releases_uploads() {
    let mut state = state_with_uploads();
    let shape = route("hello", &state.staging, &state.session);
    let before = state.log.len();

    let outcome = reconcile(
        &mut state,
        &shape,
        Ok(BackendReply::Audit(AuditResponse::stateless("Hi! Upload an invoice."))),
    );

    assert_eq!(outcome, ReconcileOutcome::StatelessReply);
    assert_eq!(state.session, Session::Unset);
    assert!(state.staging.is_empty());
    assert_eq!(state.log.len(), before + 1);
    assert_eq!(roles(&state).last(), Some(&Role::Assistant));
}

#[test]
fn uploads_staged_during_flight_survive_success() {
    let mut state = state_with_uploads();
    let shape = route("summarize", &state.staging, &state.session);
    state
        .attach(FileMeta::from_bytes("march.csv", b"x".to_vec()))
        .expect("restage");

    reconcile(
        &mut state,
        &shape,
        Ok(BackendReply::Audit(AuditResponse::with_session("s1", "a", "b"))),
    );

    assert_eq!(
        state.staging.get(DocumentKind::Csv).map(|f| f.name.as_str()),
        Some("march.csv")
    );
    assert!(state.staging.get(DocumentKind::Pdf).is_none());
}

#[test]
fn follow_up_success_appends_one_entry_and_keeps_session() {
    let mut state = ConversationState::new();
    state.session = Session::Active(SessionId::new("s1"));
    let shape = route("any duplicates?", &state.staging, &state.session);

    let outcome = reconcile(
        &mut state,
        &shape,
        Ok(BackendReply::FollowUp(FollowUpResponse {
            response: "Two invoices share number INV-7.".into(),
        })),
    );

    assert_eq!(outcome, ReconcileOutcome::FollowUpAnswered);
    assert_eq!(state.session, Session::Active(SessionId::new("s1")));
    assert_eq!(roles(&state), vec![Role::Assistant]);
}

#[test]
fn follow_up_not_found_expires_session_and_reroutes_next_send() {
    let mut state = ConversationState::new();
    state.session = Session::Active(SessionId::new("s1"));
    let shape = route("any duplicates?", &state.staging, &state.session);
    assert!(shape.is_follow_up());

    let outcome = reconcile(
        &mut state,
        &shape,
        Err(TransportError::Backend {
            status: 404,
            detail: Some("Session not found".into()),
        }),
    );

    assert!(matches!(
        outcome,
        ReconcileOutcome::Failed(ClientError::SessionExpired { .. })
    ));
    assert_eq!(state.session, Session::Unset);
    assert_eq!(state.log.len(), 1);
    let entry = &state.log.messages()[0];
    assert_eq!(entry.role, Role::System);
    assert!(entry.text.starts_with(crate::error::ERROR_MARKER));
    assert!(entry.text.contains("Session not found"));

    assert!(matches!(
        route("again", &state.staging, &state.session),
        RequestShape::NewAudit(_)
    ));
}

#[test]
fn not_found_on_new_audit_is_plain_backend_error() {
    let mut state = state_with_uploads();
    let shape = route("summarize", &state.staging, &state.session);

    let outcome = reconcile(
        &mut state,
        &shape,
        Err(TransportError::Backend {
            status: 404,
            detail: None,
        }),
    );

    assert_eq!(
        outcome,
        ReconcileOutcome::Failed(ClientError::BackendError {
            status: 404,
            detail: None
        })
    );
    assert!(!state.staging.is_empty(), "failed audits keep staged files");
}

#[test]
fn server_error_on_follow_up_keeps_session() {
    let mut state = ConversationState::new();
    state.session = Session::Active(SessionId::new("s1"));
    let shape = route("q", &state.staging, &state.session);

    reconcile(
        &mut state,
        &shape,
        Err(TransportError::Backend {
            status: 500,
            detail: Some("model overloaded".into()),
        }),
    );

    assert!(state.session.is_active());
    assert_eq!(state.log.messages()[0].text, "❌ Error: model overloaded");
}

#[test]
fn transport_failure_logs_generic_error() {
    let mut state = ConversationState::new();
    let shape = route("hello", &state.staging, &state.session);

    let outcome = reconcile(
        &mut state,
        &shape,
        Err(TransportError::Transport("connection refused".into())),
    );

    assert!(matches!(
        outcome,
        ReconcileOutcome::Failed(ClientError::TransportFailure(_))
    ));
    let entry = &state.log.messages()[0];
    assert_eq!(entry.role, Role::System);
    assert!(entry.text.contains("could not reach the audit service"));
}

#[test]
fn blank_session_id_is_treated_as_stateless() {
    let mut state = state_with_uploads();
    let shape = route("summarize", &state.staging, &state.session);
    let before = state.log.len();

    let outcome = reconcile(
        &mut state,
        &shape,
        Ok(BackendReply::Audit(AuditResponse {
            session_id: Some("  ".into()),
            response: "Here is what I found.".into(),
            initial_chat_response: Some("Ask me anything.".into()),
        })),
    );

    assert_eq!(outcome, ReconcileOutcome::StatelessReply);
    assert_eq!(state.session, Session::Unset);
    assert_eq!(state.log.len(), before + 1);
    assert_eq!(state.log.messages()[before].text, "Here is what I found.");
}

#[test]
fn session_without_initial_reply_appends_only_the_summary() {
    let mut state = state_with_uploads();
    let shape = route("summarize", &state.staging, &state.session);
    let before = state.log.len();

    let outcome = reconcile(
        &mut state,
        &shape,
        Ok(BackendReply::Audit(AuditResponse {
            session_id: Some("s2".into()),
            response: "## Summary".into(),
            initial_chat_response: None,
        })),
    );

    assert_eq!(
        outcome,
        ReconcileOutcome::AuditStarted {
            session_id: SessionId::new("s2")
        }
    );
    assert_eq!(state.session, Session::Active(SessionId::new("s2")));
    let appended: Vec<_> = state.log.messages()[before..]
        .iter()
        .map(|m| (m.role, m.text.as_str()))
        .collect();
    assert_eq!(appended, vec![(Role::Assistant, "## Summary")]);
}

#[test]
fn unreadable_document_is_reported_as_file_unavailable() {
    let mut state = state_with_uploads();
    let shape = route("summarize", &state.staging, &state.session);

    let outcome = reconcile(
        &mut state,
        &shape,
        Err(TransportError::Unreadable {
            path: "/data/invoice.csv".into(),
            reason: "permission denied".into(),
        }),
    );

    assert!(matches!(
        outcome,
        ReconcileOutcome::Failed(ClientError::FileUnavailable { .. })
    ));
    let entry = state.log.messages().last().expect("error entry");
    assert_eq!(entry.role, Role::System);
    assert!(entry.text.contains("/data/invoice.csv"));
    assert!(!entry.text.contains("could not reach"));
}

#[test]
fn undecodable_success_body_is_not_reported_as_unreachable() {
    let mut state = ConversationState::new();
    let shape = route("hello", &state.staging, &state.session);

    let outcome = reconcile(
        &mut state,
        &shape,
        Err(TransportError::InvalidResponse("expected value".into())),
    );

    assert!(matches!(
        outcome,
        ReconcileOutcome::Failed(ClientError::InvalidResponse(_))
    ));
    assert!(!state.log.messages()[0].text.contains("could not reach"));
}
