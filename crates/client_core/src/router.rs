use shared::domain::UploadId;

use crate::{
    session::{Session, SessionId},
    staging::{StagedFile, UploadStaging},
};

/// Multipart submission for the audit endpoint, captured at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSubmission {
    pub message: String,
    pub csv: Option<StagedFile>,
    pub pdf: Option<StagedFile>,
}

impl AuditSubmission {
    pub fn files(&self) -> impl Iterator<Item = &StagedFile> {
        self.csv.iter().chain(self.pdf.iter())
    }

    pub fn upload_ids(&self) -> Vec<UploadId> {
        self.files().map(|file| file.upload_id).collect()
    }

    pub fn has_documents(&self) -> bool {
        self.csv.is_some() || self.pdf.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestShape {
    NewAudit(AuditSubmission),
    FollowUp {
        session_id: SessionId,
        message: String,
    },
}

impl RequestShape {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewAudit(_) => "new_audit",
            Self::FollowUp { .. } => "follow_up",
        }
    }

    pub fn is_follow_up(&self) -> bool {
        matches!(self, Self::FollowUp { .. })
    }
}

/// Picks the request shape for one outgoing message.
///
/// Anything staged, or no active session, means a new audit. Only an active
/// session with empty slots continues as a follow-up.
pub fn route(message: &str, staging: &UploadStaging, session: &Session) -> RequestShape {
    match session {
        Session::Active(session_id) if staging.is_empty() => RequestShape::FollowUp {
            session_id: session_id.clone(),
            message: message.to_string(),
        },
        _ => RequestShape::NewAudit(AuditSubmission {
            message: message.to_string(),
            csv: staging.csv().cloned(),
            pdf: staging.pdf().cloned(),
        }),
    }
}
