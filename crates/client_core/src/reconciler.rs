use shared::{domain::Role, protocol::AuditResponse};
use tracing::{info, warn};

use crate::{
    error::{ClientError, TransportError},
    router::RequestShape,
    session::{InvalidationReason, SessionId},
    state::ConversationState,
    transport::BackendReply,
};

const NOT_FOUND: u16 = 404;

/// What a completed request did to the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// New audit answered with a session id; two assistant entries appended.
    AuditStarted { session_id: SessionId },
    /// New audit answered without a session id; one assistant entry appended.
    StatelessReply,
    FollowUpAnswered,
    /// One system entry appended describing the failure.
    Failed(ClientError),
}

/// Maps a transport failure to the client taxonomy. A 404 on a follow-up
/// means the backend no longer knows the session.
pub fn classify_failure(shape: &RequestShape, err: TransportError) -> ClientError {
    match (shape, err) {
        (
            RequestShape::FollowUp { session_id, .. },
            TransportError::Backend {
                status: NOT_FOUND,
                detail,
            },
        ) => ClientError::SessionExpired {
            session_id: session_id.clone(),
            detail,
        },
        (_, TransportError::Backend { status, detail }) => {
            ClientError::BackendError { status, detail }
        }
        (_, TransportError::Transport(reason)) => ClientError::TransportFailure(reason),
        (_, TransportError::Unreadable { path, reason }) => {
            ClientError::FileUnavailable { path, reason }
        }
        (_, TransportError::InvalidResponse(reason)) => ClientError::InvalidResponse(reason),
    }
}

/// Applies the outcome of `shape` to `state`.
pub fn reconcile(
    state: &mut ConversationState,
    shape: &RequestShape,
    result: Result<BackendReply, TransportError>,
) -> ReconcileOutcome {
    match result {
        Ok(BackendReply::Audit(response)) => apply_audit(state, shape, response),
        Ok(BackendReply::FollowUp(response)) => {
            state.log.append(response.response, Role::Assistant);
            ReconcileOutcome::FollowUpAnswered
        }
        Err(err) => {
            let error = classify_failure(shape, err);
            warn!(request = shape.kind(), error = %error, "audit request failed");
            if let ClientError::SessionExpired { session_id, .. } = &error {
                // Only drop the session this request was made against.
                if state.session.id() == Some(session_id) {
                    state.session.invalidate(InvalidationReason::Expired);
                }
            }
            state.log.append(error.log_line(), Role::System);
            ReconcileOutcome::Failed(error)
        }
    }
}

fn apply_audit(
    state: &mut ConversationState,
    shape: &RequestShape,
    response: AuditResponse,
) -> ReconcileOutcome {
    if let RequestShape::NewAudit(submission) = shape {
        state.staging.release_consumed(&submission.upload_ids());
    }

    let AuditResponse {
        session_id,
        response,
        initial_chat_response,
    } = response;

    match session_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => {
            let session_id = SessionId::new(id);
            info!(%session_id, "audit session established");
            state.session.activate(session_id.clone());
            state.log.append(response, Role::Assistant);
            match initial_chat_response {
                Some(reply) => {
                    state.log.append(reply, Role::Assistant);
                }
                None => warn!(%session_id, "audit response carried no initial chat reply"),
            }
            ReconcileOutcome::AuditStarted { session_id }
        }
        None => {
            info!("audit answered without a session (stateless fallback)");
            state.log.append(response, Role::Assistant);
            ReconcileOutcome::StatelessReply
        }
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
