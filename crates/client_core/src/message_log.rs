use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::domain::{MessageId, Role};

const FIRST_MESSAGE_ID: u64 = 1;

/// A single chat entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Append-only, insertion-ordered chat log.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: Vec<Message>,
    next_id: u64,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: FIRST_MESSAGE_ID,
        }
    }

    pub fn append(&mut self, text: impl Into<String>, role: Role) -> &Message {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.entries.push(Message {
            id,
            text: text.into(),
            role,
            created_at: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Empties the log and rewinds the id counter in the same step.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_id = FIRST_MESSAGE_ID;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
