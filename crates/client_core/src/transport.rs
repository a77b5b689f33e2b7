use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    error::ErrorBody,
    protocol::{AuditResponse, FollowUpRequest, FollowUpResponse},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::TransportError,
    router::{AuditSubmission, RequestShape},
    session::SessionId,
    staging::{StagedFile, UploadSource},
};

/// The two backend endpoints the controller talks to.
#[async_trait]
pub trait AuditTransport: Send + Sync {
    async fn submit_audit(
        &self,
        submission: &AuditSubmission,
    ) -> Result<AuditResponse, TransportError>;
    async fn follow_up(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<FollowUpResponse, TransportError>;
}

/// Successful reply, tagged by the endpoint that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Audit(AuditResponse),
    FollowUp(FollowUpResponse),
}

/// Issues `shape` through `transport`.
pub async fn dispatch(
    transport: &dyn AuditTransport,
    shape: &RequestShape,
) -> Result<BackendReply, TransportError> {
    match shape {
        RequestShape::NewAudit(submission) => transport
            .submit_audit(submission)
            .await
            .map(BackendReply::Audit),
        RequestShape::FollowUp {
            session_id,
            message,
        } => transport
            .follow_up(session_id, message)
            .await
            .map(BackendReply::FollowUp),
    }
}

/// reqwest-backed transport: multipart `POST {base}/audit` and JSON
/// `POST {base}/chat/{session_id}`.
pub struct HttpAuditTransport {
    http: Client,
    base_url: String,
}

impl HttpAuditTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            TransportError::transport(format!("invalid api base url '{}': {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::transport(format!(
                    "api base url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn read_document(file: &StagedFile) -> Result<Vec<u8>, TransportError> {
    match &file.source {
        UploadSource::Memory(bytes) => Ok(bytes.as_ref().clone()),
        UploadSource::Path(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|e| TransportError::Unreadable {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
        }
    }
}

async fn document_part(file: &StagedFile) -> Result<Part, TransportError> {
    let bytes = read_document(file).await?;
    Part::bytes(bytes)
        .file_name(file.name.clone())
        .mime_str(file.kind.mime_type())
        .map_err(TransportError::transport)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        let detail = ErrorBody::describe(&body);
        warn!(status = status.as_u16(), ?detail, "audit backend rejected request");
        return Err(TransportError::Backend {
            status: status.as_u16(),
            detail,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| TransportError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl AuditTransport for HttpAuditTransport {
    async fn submit_audit(
        &self,
        submission: &AuditSubmission,
    ) -> Result<AuditResponse, TransportError> {
        let url = self.endpoint(&["audit"])?;
        let mut form = Form::new().text("message", submission.message.clone());
        for file in submission.files() {
            debug!(kind = %file.kind, name = %file.name, size_bytes = file.size_bytes, "attaching document");
            form = form.part(file.kind.form_field(), document_part(file).await?);
        }

        info!(
            %url,
            csv = submission.csv.as_ref().map(|f| f.name.as_str()),
            pdf = submission.pdf.as_ref().map(|f| f.name.as_str()),
            "submitting audit request"
        );
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::transport)?;
        decode(response).await
    }

    async fn follow_up(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<FollowUpResponse, TransportError> {
        let url = self.endpoint(&["chat", session_id.as_str()])?;
        info!(%url, %session_id, "sending follow-up message");
        let response = self
            .http
            .post(url)
            .json(&FollowUpRequest {
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(TransportError::transport)?;
        decode(response).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
