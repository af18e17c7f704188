//! Which stored messages a given identity may read.

use crate::common::{BROADCAST_RECIPIENT, ChatError, ChatMessage, ChatResult, MessageKind};

/// Everything except private messages neither sent by nor addressed to
/// `identity`.
pub fn is_visible_to(message: &ChatMessage, identity: &str) -> bool {
    message.recipient == identity
        || message.sender == identity
        || message.recipient == BROADCAST_RECIPIENT
        || matches!(message.kind, MessageKind::Status | MessageKind::Message)
}

/// Messages from `all` visible to `for_identity`, in their original order.
///
/// With a `limit`, only the last `limit` visible messages are kept; the
/// result is still oldest first.
pub fn visible_messages(
    for_identity: &str,
    all: &[ChatMessage],
    limit: Option<usize>,
) -> Vec<ChatMessage> {
    let visible: Vec<&ChatMessage> = all
        .iter()
        .filter(|message| is_visible_to(message, for_identity))
        .collect();

    let skip = match limit {
        Some(limit) => visible.len().saturating_sub(limit),
        None => 0,
    };

    visible.into_iter().skip(skip).cloned().collect()
}

/// Parse the optional `limit` query value. Absent means no limit; anything
/// other than a positive integer is rejected.
pub fn parse_limit(raw: Option<&str>) -> ChatResult<Option<usize>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ChatError::Validation(format!("limit `{raw}` is not an integer")))?;
    if value <= 0 {
        return Err(ChatError::Validation(format!(
            "limit must be positive, got {value}"
        )));
    }

    usize::try_from(value)
        .map(Some)
        .map_err(|_| ChatError::Validation(format!("limit {value} is too large")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn msg(sender: &str, recipient: &str, body: &str, kind: MessageKind) -> ChatMessage {
        ChatMessage::new(sender, recipient, body, kind, Utc::now())
    }

    fn bodies(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.body.as_str()).collect()
    }

    fn mixed() -> Vec<ChatMessage> {
        vec![
            msg("alice", "ALL", "joined", MessageKind::Status),
            msg("bob", "carol", "psst", MessageKind::PrivateMessage),
            msg("bob", "alice", "for alice", MessageKind::PrivateMessage),
            msg("alice", "dave", "from alice", MessageKind::PrivateMessage),
            msg("carol", "bob", "public reply", MessageKind::Message),
            msg("eve", "ALL", "private to all", MessageKind::PrivateMessage),
        ]
    }

    #[test]
    fn hides_private_messages_of_others() {
        let all = mixed();
        let seen = visible_messages("alice", &all, None);
        assert_eq!(
            bodies(&seen),
            vec![
                "joined",
                "for alice",
                "from alice",
                "public reply",
                "private to all"
            ]
        );
        assert!(!seen.iter().any(|m| m.body == "psst"));
    }

    #[test]
    fn status_and_public_messages_are_always_visible() {
        let all = mixed();
        let seen = visible_messages("zed", &all, None);
        assert_eq!(bodies(&seen), vec!["joined", "public reply", "private to all"]);
    }

    #[test]
    fn directed_status_is_visible_to_third_parties() {
        let all = vec![msg("bob", "carol", "away", MessageKind::Status)];
        let seen = visible_messages("alice", &all, None);
        assert_eq!(bodies(&seen), vec!["away"]);
        assert!(is_visible_to(&all[0], "zed"));
    }

    #[test]
    fn limit_keeps_the_tail_in_original_order() {
        let all: Vec<_> = (1..=5)
            .map(|i| msg("alice", "ALL", &format!("m{i}"), MessageKind::Message))
            .collect();

        let seen = visible_messages("bob", &all, Some(2));
        assert_eq!(bodies(&seen), vec!["m4", "m5"]);

        let everything = visible_messages("bob", &all, Some(50));
        assert_eq!(everything.len(), 5);
    }

    #[test]
    fn limit_applies_after_filtering() {
        let all = mixed();
        let seen = visible_messages("zed", &all, Some(2));
        assert_eq!(bodies(&seen), vec!["public reply", "private to all"]);
    }

    #[test]
    fn parse_limit_accepts_positive_integers() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(parse_limit(Some("2")).unwrap(), Some(2));
        assert_eq!(parse_limit(Some(" 7 ")).unwrap(), Some(7));
    }

    #[test]
    fn parse_limit_rejects_invalid_values() {
        for raw in ["0", "-1", "abc", "", "2.5"] {
            assert!(
                matches!(parse_limit(Some(raw)), Err(ChatError::Validation(_))),
                "limit {raw:?} should be rejected"
            );
        }
    }
}
