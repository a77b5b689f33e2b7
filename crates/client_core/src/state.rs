use shared::domain::{DocumentKind, Role};

use crate::{
    error::StagingError,
    message_log::MessageLog,
    session::{InvalidationReason, Session},
    staging::{FileMeta, StagedFile, UploadStaging},
};

/// Log, staging slots and session, mutated only through the controller.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub log: MessageLog,
    pub staging: UploadStaging,
    pub session: Session,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `meta`. Any accepted document drops the active session, since a
    /// new document always means a fresh audit.
    pub fn attach(&mut self, meta: FileMeta) -> Result<StagedFile, StagingError> {
        let staged = self.staging.stage(meta)?.clone();
        self.session.invalidate(InvalidationReason::NewUpload);
        self.log
            .append(format!("📁 Uploaded: {}", staged.name), Role::User);
        self.log.append(
            format!(
                "🔍 {} is staged and will be processed and analyzed with your next message.",
                staged.name
            ),
            Role::System,
        );
        Ok(staged)
    }

    pub fn remove(&mut self, kind: DocumentKind) -> Option<StagedFile> {
        self.staging.remove(kind)
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.staging.clear();
        self.session.invalidate(InvalidationReason::Cleared);
    }
}
