use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use serde::Serialize;
use shared::domain::{DocumentKind, Role};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

pub mod error;
pub mod message_log;
pub mod reconciler;
pub mod router;
pub mod session;
pub mod staging;
pub mod state;
pub mod transport;

pub use error::{ClientError, StagingError, TransportError};
pub use message_log::{Message, MessageLog};
pub use reconciler::ReconcileOutcome;
pub use router::{route, AuditSubmission, RequestShape};
pub use session::{Session, SessionId};
pub use staging::{FileMeta, StagedFileSummary, UploadSource, MAX_UPLOAD_BYTES};
pub use state::ConversationState;
pub use transport::{AuditTransport, BackendReply, HttpAuditTransport};

const EVENT_CAPACITY: usize = 256;

/// Sent in place of a blank message when documents are staged; the audit
/// endpoint requires a non-empty `message` field.
pub const DEFAULT_AUDIT_PROMPT: &str = "Analyze the uploaded documents";

/// Change notifications for renderers. Renderers only observe; every mutation
/// goes through [`AuditChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessageAppended(Message),
    StagingChanged(Vec<StagedFileSummary>),
    SessionChanged(Session),
    BusyChanged(bool),
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A request is already outstanding.
    Busy,
    /// Blank text and nothing staged.
    EmptyMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Ignored(IgnoreReason),
    Completed(ReconcileOutcome),
    /// The conversation was cleared while the request was in flight.
    Discarded,
}

/// Point-in-time copy of everything a renderer draws.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub staged: Vec<StagedFileSummary>,
    pub session: Session,
    pub busy: bool,
}

struct ClientState {
    conversation: ConversationState,
    generation: u64,
}

/// What renderers saw before a mutation, used to emit the resulting events.
struct Observed {
    log_len: usize,
    staged: Vec<StagedFileSummary>,
    session: Session,
}

impl Observed {
    fn capture(state: &ClientState) -> Self {
        Self {
            log_len: state.conversation.log.len(),
            staged: state.conversation.staging.summaries(),
            session: state.conversation.session.clone(),
        }
    }
}

/// Conversation/session controller for the audit service.
///
/// One request may be outstanding at a time. The network call runs without
/// holding the state lock, so staging changes made meanwhile apply to the
/// next send.
pub struct AuditChatClient {
    transport: Arc<dyn AuditTransport>,
    inner: Mutex<ClientState>,
    busy: AtomicBool,
    events: broadcast::Sender<ChatEvent>,
}

/// Holds the busy flag for one in-flight send. Dropping it, whether the send
/// completed, was aborted or panicked, returns the client to idle.
struct BusyGuard<'a> {
    client: &'a AuditChatClient,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.client.busy.store(false, Ordering::Release);
        self.client.emit(ChatEvent::BusyChanged(false));
    }
}

impl AuditChatClient {
    pub fn new(transport: Arc<dyn AuditTransport>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            transport,
            inner: Mutex::new(ClientState {
                conversation: ConversationState::new(),
                generation: 0,
            }),
            busy: AtomicBool::new(false),
            events,
        })
    }

    pub fn with_http(api_base_url: impl Into<String>) -> Arc<Self> {
        Self::new(Arc::new(HttpAuditTransport::new(api_base_url)))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_changes(&self, before: Observed, state: &ClientState) {
        let conversation = &state.conversation;
        for message in conversation.log.messages().iter().skip(before.log_len) {
            self.emit(ChatEvent::MessageAppended(message.clone()));
        }
        let staged = conversation.staging.summaries();
        if staged != before.staged {
            self.emit(ChatEvent::StagingChanged(staged));
        }
        if conversation.session != before.session {
            self.emit(ChatEvent::SessionChanged(conversation.session.clone()));
        }
    }

    /// Stages a document. Accepting any document drops the active session.
    pub async fn attach(&self, meta: FileMeta) -> Result<StagedFileSummary, ClientError> {
        let mut inner = self.inner.lock().await;
        let before = Observed::capture(&inner);
        let staged = inner.conversation.attach(meta).map_err(|err| {
            debug!(error = %err, "upload rejected");
            ClientError::from(err)
        })?;
        info!(kind = %staged.kind, name = %staged.name, size_bytes = staged.size_bytes, "document staged");
        self.emit_changes(before, &inner);
        Ok(StagedFileSummary::from(&staged))
    }

    /// Stats `path` and stages it.
    pub async fn attach_path(&self, path: impl AsRef<Path>) -> Result<StagedFileSummary, ClientError> {
        let path = path.as_ref();
        let unavailable = |reason: String| ClientError::FileUnavailable {
            path: path.display().to_string(),
            reason,
        };
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(unavailable("not a regular file".to_string()));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| unavailable("path has no file name".to_string()))?;

        self.attach(FileMeta {
            name,
            size_bytes: metadata.len(),
            source: UploadSource::Path(path.to_path_buf()),
        })
        .await
    }

    /// Clears one staging slot. The session is left as is.
    pub async fn remove(&self, kind: DocumentKind) -> Option<StagedFileSummary> {
        let mut inner = self.inner.lock().await;
        let before = Observed::capture(&inner);
        let removed = inner.conversation.remove(kind);
        self.emit_changes(before, &inner);
        removed.as_ref().map(StagedFileSummary::from)
    }

    /// Empties the log, both slots and the session, and restarts message ids.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let before = Observed::capture(&inner);
        inner.conversation.clear();
        inner.generation += 1;
        info!(busy = self.busy.load(Ordering::Acquire), "conversation cleared");
        self.emit(ChatEvent::Cleared);
        self.emit_changes(
            Observed {
                log_len: 0,
                ..before
            },
            &inner,
        );
    }

    /// Sends one user message, routing it as a new audit or a follow-up.
    ///
    /// Ignored while another send is outstanding. A blank message with staged
    /// documents is sent as [`DEFAULT_AUDIT_PROMPT`]. If the returned future is
    /// dropped before completing, the reply is lost and the client goes idle.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let (shape, generation, guard) = {
            let mut inner = self.inner.lock().await;
            if self.busy.load(Ordering::Acquire) {
                debug!("send ignored: request already outstanding");
                return SendOutcome::Ignored(IgnoreReason::Busy);
            }
            let text = match text.trim() {
                "" if inner.conversation.staging.is_empty() => {
                    return SendOutcome::Ignored(IgnoreReason::EmptyMessage);
                }
                "" => DEFAULT_AUDIT_PROMPT,
                text => text,
            };

            let before = Observed::capture(&inner);
            inner.conversation.log.append(text, Role::User);
            let shape = route(
                text,
                &inner.conversation.staging,
                &inner.conversation.session,
            );
            self.busy.store(true, Ordering::Release);
            let guard = BusyGuard { client: self };
            self.emit_changes(before, &inner);
            self.emit(ChatEvent::BusyChanged(true));
            (shape, inner.generation, guard)
        };

        info!(request = shape.kind(), "dispatching request");
        let result = transport::dispatch(self.transport.as_ref(), &shape).await;

        let mut inner = self.inner.lock().await;
        let outcome = if inner.generation != generation {
            debug!(request = shape.kind(), "discarding reply for a cleared conversation");
            SendOutcome::Discarded
        } else {
            let before = Observed::capture(&inner);
            let outcome = reconciler::reconcile(&mut inner.conversation, &shape, result);
            self.emit_changes(before, &inner);
            SendOutcome::Completed(outcome)
        };
        drop(inner);
        drop(guard);
        outcome
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn session(&self) -> Session {
        self.inner.lock().await.conversation.session.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.conversation.log.messages().to_vec()
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let inner = self.inner.lock().await;
        ChatSnapshot {
            messages: inner.conversation.log.messages().to_vec(),
            staged: inner.conversation.staging.summaries(),
            session: inner.conversation.session.clone(),
            busy: self.is_busy(),
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
