pub mod errors;
pub mod types;

pub use errors::{ChatError, ChatResult};
pub use types::{
    BROADCAST_RECIPIENT, ChatMessage, JOINED_STATUS, LEFT_STATUS, MessageDraft, MessageKind,
    Participant, RegisterRequest,
};
