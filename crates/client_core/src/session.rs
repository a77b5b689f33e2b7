use std::fmt;

use serde::Serialize;

/// Opaque identifier of a backend-held audit session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "session_id", rename_all = "snake_case")]
pub enum Session {
    #[default]
    Unset,
    Active(SessionId),
}

/// Why a session went back to `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    NewUpload,
    Cleared,
    Expired,
}

impl Session {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn id(&self) -> Option<&SessionId> {
        match self {
            Self::Active(id) => Some(id),
            Self::Unset => None,
        }
    }

    pub fn activate(&mut self, id: SessionId) {
        *self = Self::Active(id);
    }

    /// Resets to `Unset`, returning the id that was dropped if any.
    pub fn invalidate(&mut self, reason: InvalidationReason) -> Option<SessionId> {
        let previous = std::mem::take(self);
        match previous {
            Self::Active(id) => {
                tracing::debug!(session_id = %id, ?reason, "audit session invalidated");
                Some(id)
            }
            Self::Unset => None,
        }
    }
}
