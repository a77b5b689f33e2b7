use serde::{Deserialize, Serialize};

/// Success body of `POST /audit`.
///
/// The stateful path carries all three fields. The stateless fallback, used
/// when the backend found no document context, carries only `response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_chat_response: Option<String>,
}

impl AuditResponse {
    pub fn stateless(response: impl Into<String>) -> Self {
        Self {
            session_id: None,
            response: response.into(),
            initial_chat_response: None,
        }
    }

    pub fn with_session(
        session_id: impl Into<String>,
        response: impl Into<String>,
        initial_chat_response: impl Into<String>,
    ) -> Self {
        Self {
            session_id: Some(session_id.into()),
            response: response.into(),
            initial_chat_response: Some(initial_chat_response.into()),
        }
    }
}

/// Body of `POST /chat/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpResponse {
    pub response: String,
}
