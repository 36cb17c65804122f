//! Runtime configuration, read from the process environment.

use std::path::PathBuf;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::agent::tools::ToolSettings;
use crate::error::ConfigError;
use crate::llm::{DEFAULT_ENDPOINT, DEFAULT_MODEL, LLMConfig};
use crate::prompts::SYSTEM_PROMPT;
use crate::trigger::TriggerConfig;

pub const DEFAULT_LOG_PATH: &str = "/usr/local/games/minecraft_server/Enderforce2/logs/latest.log";
pub const DEFAULT_SCREEN_SESSION: &str = "mc-Enderforce2";
pub const DEFAULT_RESPONSE_LOG: &str = "chat_history.log";
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_TRIGGER: &str = "!bot";
pub const DEFAULT_BOT_NAME: &str = "Alfred";

pub const DEFAULT_ENGAGE_WORDS: &[&str] = &[
    "help", "how", "where", "why", "what", "can", "anyone", "tip", "idea", "question",
];

pub const DEFAULT_ALERT_WORDS: &[&str] = &[
    // insults
    "stupid", "idiot", "hate", "dumb", "shut up", "noob", "trash", "bully", "loser", "moron",
    "clown", "crybaby", "lame", "garbage", "worthless", "pathetic", "annoying",
    "nobody likes you",
    // threats
    "kill", "kys", "die ", "die.", "i'll kill", "i will kill", "hurt you", "break your",
    "fight me", "pull up",
    // self-harm
    "i want to die", "i wanna die", "i hate myself", "i'm done", "i'm useless", "no one cares",
    "kill myself", "suicide", "self harm", "cut myself",
    // profanity
    "wtf", "omfg", "bs", "damn", "hell", "bitch", "ass", "dumbass", "jackass", "shit", "fuck",
    "f off", "f u",
    // harassment
    "go away", "get lost", "stop talking", "you don't belong", "everyone hates you",
    "no one likes you",
    // inappropriate
    "nsfw", "nude", "nudes", "sex", "sext", "porn", "horny", "send pics", "send a pic",
    "send photo",
    // grooming
    "where do you live", "what's your address", "what school", "what grade", "are you alone",
    "are your parents home", "snapchat", "snap me", "dm me", "private chat",
    // substances and weapons
    "weed", "vape", "drugs", "alcohol", "vodka", "stab", "shoot", "gun", "bomb",
];

lazy_static! {
    static ref DURATION_PART: Regex = Regex::new(r"(\d+(?:\.\d+)?)(ms|s|m|h)").expect("duration pattern is valid");
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMConfig,
    pub log_path: PathBuf,
    pub screen_session: String,
    pub system_prompt: String,
    pub reply_cooldown: Duration,
    pub response_log: PathBuf,
    pub triggers: TriggerConfig,
    pub tools: ToolSettings,
    pub enable_alert_lightning: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unset and empty values
    /// fall back to defaults; only the API key is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let string_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let flag = |key: &str| parse_flag(var(key).as_deref(), true);

        let api_key = var("DEMETERICS_API_KEY").ok_or(ConfigError::Missing("DEMETERICS_API_KEY"))?;
        let llm = LLMConfig {
            model: string_or("DEMETERICS_MODEL", DEFAULT_MODEL),
            endpoint: string_or("DEMETERICS_API_URL", DEFAULT_ENDPOINT),
            ..LLMConfig::new(api_key)
        };

        let reply_cooldown = match var("MCCHATBOT_REPLY_COOLDOWN") {
            None => DEFAULT_COOLDOWN,
            Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
                warn!("Ignoring unparsable MCCHATBOT_REPLY_COOLDOWN={raw:?}");
                DEFAULT_COOLDOWN
            }),
        };

        let tools = ToolSettings {
            enable_tool_use: flag("MCCHATBOT_ENABLE_TOOL_USE"),
            enable_world_tools: flag("MCCHATBOT_ENABLE_WORLD_TOOL"),
            enable_easter_eggs: flag("MCCHATBOT_ENABLE_EASTER_EGGS"),
        };

        let triggers = TriggerConfig {
            bot_name: string_or("MCCHATBOT_NAME", DEFAULT_BOT_NAME),
            trigger_word: string_or("MCCHATBOT_TRIGGER", DEFAULT_TRIGGER),
            engage_words: parse_word_list(var("MCCHATBOT_ENGAGE_WORDS").as_deref(), DEFAULT_ENGAGE_WORDS),
            alert_words: parse_word_list(var("MCCHATBOT_ALERT_WORDS").as_deref(), DEFAULT_ALERT_WORDS),
            enable_name: flag("MCCHATBOT_ENABLE_NAME_TRIGGER"),
            enable_prefix: flag("MCCHATBOT_ENABLE_PREFIX_TRIGGER"),
            enable_alert: flag("MCCHATBOT_ENABLE_ALERT_TRIGGER"),
            enable_teleport_intent: tools.enable_tool_use,
            enable_engagement: flag("MCCHATBOT_ENABLE_QUESTION_TRIGGER"),
        };

        // An explicitly empty response log disables auditing.
        let response_log = match lookup("MCCHATBOT_RESPONSE_LOG") {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_RESPONSE_LOG),
        };

        Ok(Self {
            llm,
            log_path: PathBuf::from(string_or("MCCHATBOT_LOG_PATH", DEFAULT_LOG_PATH)),
            screen_session: string_or("MCCHATBOT_SCREEN_NAME", DEFAULT_SCREEN_SESSION),
            system_prompt: string_or("MCCHATBOT_SYSTEM_PROMPT", SYSTEM_PROMPT),
            reply_cooldown,
            response_log,
            triggers,
            tools,
            enable_alert_lightning: flag("MCCHATBOT_ENABLE_ALERT_LIGHTNING"),
        })
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive; anything else is `default`.
pub fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Comma-separated, trimmed and lower-cased. Falls back to `defaults` when nothing is left.
pub fn parse_word_list(raw: Option<&str>, defaults: &[&str]) -> Vec<String> {
    let words: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return defaults.iter().map(|w| w.to_string()).collect();
    }
    words
}

/// Parses durations such as `30s`, `1m30s`, `500ms` or `1.5h`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut total = 0.0_f64;
    let mut consumed = 0;
    for caps in DURATION_PART.captures_iter(raw) {
        let whole = caps.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();
        let value: f64 = caps[1].parse().ok()?;
        total += match &caps[2] {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            _ => value * 3600.0,
        };
    }
    if consumed != raw.len() || !total.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(total).ok()
}
