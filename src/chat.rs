use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::common::{ChatError, ChatMessage, ChatResult, MessageDraft, MessageKind};
use crate::storage::ChatStore;
use crate::visibility::{parse_limit, visible_messages};

/// Posting, listing, editing and deleting chat messages.
pub struct MessageBoard {
    store: Arc<dyn ChatStore>,
}

struct ValidDraft {
    recipient: String,
    body: String,
    kind: MessageKind,
}

impl MessageBoard {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub fn post(
        &self,
        sender: &str,
        draft: MessageDraft,
        now: DateTime<Utc>,
    ) -> ChatResult<ChatMessage> {
        let draft = self.validate(sender, draft)?;
        let message = ChatMessage::new(sender, draft.recipient, draft.body, draft.kind, now);
        self.store.insert_message(&message)?;
        log::debug!("{sender} posted {} to {}", message.kind, message.recipient);
        Ok(message)
    }

    pub fn list(&self, for_identity: &str, raw_limit: Option<&str>) -> ChatResult<Vec<ChatMessage>> {
        let limit = parse_limit(raw_limit)?;
        let all = self.store.list_messages()?;
        Ok(visible_messages(for_identity, &all, limit))
    }

    pub fn edit(&self, user: &str, id: &str, draft: MessageDraft) -> ChatResult<ChatMessage> {
        let draft = self.validate(user, draft)?;
        let mut message = self.owned_message(user, id)?;

        message.recipient = draft.recipient;
        message.body = draft.body;
        message.kind = draft.kind;
        if !self.store.update_message(&message)? {
            return Err(ChatError::NotFound(format!("message `{id}`")));
        }
        Ok(message)
    }

    pub fn delete(&self, user: &str, id: &str) -> ChatResult<()> {
        self.owned_message(user, id)?;
        if !self.store.delete_message(id)? {
            return Err(ChatError::NotFound(format!("message `{id}`")));
        }
        log::debug!("{user} deleted message {id}");
        Ok(())
    }

    fn owned_message(&self, user: &str, id: &str) -> ChatResult<ChatMessage> {
        let message = self
            .store
            .find_message(id)?
            .ok_or_else(|| ChatError::NotFound(format!("message `{id}`")))?;
        if message.sender != user {
            return Err(ChatError::Unauthorized(format!(
                "message `{id}` belongs to another participant"
            )));
        }
        Ok(message)
    }

    fn validate(&self, sender: &str, draft: MessageDraft) -> ChatResult<ValidDraft> {
        let recipient = non_blank(draft.to, "to")?;
        let body = non_blank(draft.text, "text")?;
        let kind = match draft.kind.as_deref() {
            Some("message") => MessageKind::Message,
            Some("private_message") => MessageKind::PrivateMessage,
            Some(other) => {
                return Err(ChatError::Validation(format!(
                    "type must be `message` or `private_message`, got `{other}`"
                )));
            }
            None => return Err(ChatError::validation("type is required")),
        };

        if self.store.find_participant(sender)?.is_none() {
            return Err(ChatError::Validation(format!(
                "sender `{sender}` is not a participant"
            )));
        }

        Ok(ValidDraft {
            recipient,
            body,
            kind,
        })
    }
}

fn non_blank(value: Option<String>, field: &str) -> ChatResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ChatError::Validation(format!("{field} must not be empty"))),
    }
}
