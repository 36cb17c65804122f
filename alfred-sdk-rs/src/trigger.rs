//! Decides whether a chat event deserves a reply.
//!
//! Rules are evaluated in a fixed order and the first match wins. Matching is
//! plain substring containment on the lower-cased text; compound words can
//! match a keyword, and that is accepted behaviour.

use lazy_static::lazy_static;
use regex::Regex;

use crate::events::ChatEvent;

/// Prompt used when the trigger token is sent with nothing after it.
pub const EMPTY_PREFIX_PROMPT: &str = "Hello!";

lazy_static! {
    static ref TELEPORT_INTENT: Regex =
        Regex::new(r"(?i)\b(?:tp|teleport)\s+(?:me\s+)?to\s+([A-Za-z0-9_]{1,16})\b")
            .expect("teleport pattern is valid");
}

#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub bot_name: String,
    pub trigger_word: String,
    pub engage_words: Vec<String>,
    pub alert_words: Vec<String>,
    pub enable_name: bool,
    pub enable_prefix: bool,
    pub enable_alert: bool,
    /// The teleport rule only makes sense when the model may call tools.
    pub enable_teleport_intent: bool,
    pub enable_engagement: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRule {
    NameMention,
    PrefixCommand,
    Alert,
    TeleportIntent,
    Engagement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub rule: TriggerRule,
    /// Text sent upstream as the player's message.
    pub prompt: String,
}

impl Trigger {
    pub fn is_alert(&self) -> bool {
        self.rule == TriggerRule::Alert
    }
}

/// Returns the first rule that fires for `event`, or `None` when no reply is warranted.
pub fn classify(config: &TriggerConfig, event: &ChatEvent) -> Option<Trigger> {
    let text = event.text.as_str();
    let lower = text.to_lowercase();
    let fire = |rule, prompt: String| Some(Trigger { rule, prompt });

    if config.enable_name
        && !config.bot_name.is_empty()
        && lower.contains(&config.bot_name.to_lowercase())
    {
        return fire(TriggerRule::NameMention, text.to_string());
    }

    let token = config.trigger_word.to_lowercase();
    let prefixed = config.enable_prefix && !token.is_empty();
    if let Some(remainder) = prefixed.then(|| strip_prefix_folded(text, &token)).flatten() {
        let remainder = remainder.trim();
        let prompt = if remainder.is_empty() {
            EMPTY_PREFIX_PROMPT.to_string()
        } else {
            remainder.to_string()
        };
        return fire(TriggerRule::PrefixCommand, prompt);
    }

    if config.enable_alert && contains_any(&lower, &config.alert_words) {
        return fire(TriggerRule::Alert, moderation_prompt(text));
    }

    if config.enable_teleport_intent && TELEPORT_INTENT.is_match(text) {
        return fire(TriggerRule::TeleportIntent, text.to_string());
    }

    if config.enable_engagement && (text.contains('?') || contains_any(&lower, &config.engage_words)) {
        return fire(TriggerRule::Engagement, text.to_string());
    }

    None
}

pub fn moderation_prompt(text: &str) -> String {
    format!("Gently remind about kindness and safety. Conversation snippet: {text}")
}

/// Strips `token` (already lower-cased) from the start of `text`, ignoring
/// case. The rest keeps its original casing. Folding can change byte length,
/// so the split point is found on `text` itself.
fn strip_prefix_folded<'a>(text: &'a str, token: &str) -> Option<&'a str> {
    let mut folded = String::with_capacity(token.len());
    let mut end = text.len();
    for (i, c) in text.char_indices() {
        if folded.len() >= token.len() {
            end = i;
            break;
        }
        folded.extend(c.to_lowercase());
    }
    (folded == token).then(|| &text[end..])
}

/// Case-sensitive containment; callers pass lower-cased text and keywords.
fn contains_any(text: &str, words: &[String]) -> bool {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .any(|w| text.contains(w.as_str()))
}
