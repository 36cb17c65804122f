use chrono::{DateTime, Utc};

/// Substring that identifies a player chat line in the server log.
pub const CHAT_MARKER: &str = "Async Chat Thread";

const NAME_OPEN: &str = "]: <";
const NAME_CLOSE: &str = "> ";

/// One player message taken from the server log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub player: String,
    pub text: String,
    pub observed_at: DateTime<Utc>,
}

impl ChatEvent {
    pub fn new(player: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            text: text.into(),
            observed_at: Utc::now(),
        }
    }
}

/// Parses a raw log line into a chat event.
///
/// Only lines carrying [`CHAT_MARKER`] followed by `]: <player> message` are
/// accepted. Everything else, including a missing closing `>`, is rejected
/// with `None`. The timestamp is the time of parsing, not the one in the log.
pub fn parse_chat_line(line: &str) -> Option<ChatEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.contains(CHAT_MARKER) {
        return None;
    }
    let start = line.find(NAME_OPEN)? + NAME_OPEN.len();
    let rest = &line[start..];
    let end = rest.find(NAME_CLOSE)?;
    let player = &rest[..end];
    if player.is_empty() {
        return None;
    }
    let text = rest[end + NAME_CLOSE.len()..].trim();
    Some(ChatEvent::new(player, text))
}
