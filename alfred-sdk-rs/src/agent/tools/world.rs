//! World-state tools: time of day and weather.
//!
//! Free-form values from the model are normalised to the closed vocabulary
//! the server understands. Anything outside it is an error, so nothing
//! unexpected ever reaches the console.

use std::fmt;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ToolError;

pub const MAX_TICKS: i64 = 24_000;

#[derive(Debug, Default, Deserialize)]
pub(super) struct TimeArguments {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct WeatherArguments {
    #[serde(default)]
    pub state: Option<String>,
}

/// A time the `time set` command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Day,
    Noon,
    Night,
    Midnight,
    /// Absolute tick count in `0..=24000`.
    Ticks(u32),
}

impl TimeOfDay {
    /// Accepts `day|noon|night|midnight` in any case, or a tick count in range.
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let value = raw.trim().to_lowercase();
        match value.as_str() {
            "" => Err(ToolError::Missing("time value")),
            "day" => Ok(Self::Day),
            "noon" => Ok(Self::Noon),
            "night" => Ok(Self::Night),
            "midnight" => Ok(Self::Midnight),
            _ => match value.parse::<i64>() {
                Ok(ticks) if (0..=MAX_TICKS).contains(&ticks) => Ok(Self::Ticks(ticks as u32)),
                Ok(_) => Err(ToolError::TimeOutOfRange),
                Err(_) => Err(ToolError::UnsupportedTime(raw.to_string())),
            },
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => f.write_str("day"),
            Self::Noon => f.write_str("noon"),
            Self::Night => f.write_str("night"),
            Self::Midnight => f.write_str("midnight"),
            Self::Ticks(ticks) => write!(f, "{ticks}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weather {
    Clear,
    Rain,
    Thunder,
}

impl Weather {
    /// Accepts the canonical states plus `sun`, `sunny`, `rainy` and `storm`.
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw.trim().to_lowercase().as_str() {
            "" => Err(ToolError::Missing("weather value")),
            "clear" | "sun" | "sunny" => Ok(Self::Clear),
            "rain" | "rainy" => Ok(Self::Rain),
            "thunder" | "storm" => Ok(Self::Thunder),
            _ => Err(ToolError::UnsupportedWeather(raw.to_string())),
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::Thunder => "thunder",
        })
    }
}

pub(super) fn time_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "value": {
                "type": "string",
                "description": "Target time (day, noon, night, midnight, or ticks 0-24000)."
            }
        },
        "required": ["value"]
    })
}

pub(super) fn weather_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "state": {
                "type": "string",
                "description": "Weather state (clear, rain, thunder/storm)."
            }
        },
        "required": ["state"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_keywords_are_case_insensitive() {
        assert_eq!(TimeOfDay::parse("NOON").unwrap().to_string(), "noon");
        assert_eq!(TimeOfDay::parse(" Midnight ").unwrap(), TimeOfDay::Midnight);
    }

    #[test]
    fn test_time_ticks_are_range_checked() {
        assert_eq!(TimeOfDay::parse("0").unwrap(), TimeOfDay::Ticks(0));
        assert_eq!(TimeOfDay::parse("24000").unwrap().to_string(), "24000");
        assert!(matches!(TimeOfDay::parse("25000"), Err(ToolError::TimeOutOfRange)));
        assert!(matches!(TimeOfDay::parse("-1"), Err(ToolError::TimeOutOfRange)));
    }

    #[test]
    fn test_time_rejects_unknown_words() {
        assert!(matches!(TimeOfDay::parse("dusk"), Err(ToolError::UnsupportedTime(v)) if v == "dusk"));
        assert!(matches!(TimeOfDay::parse("  "), Err(ToolError::Missing(_))));
    }

    #[test]
    fn test_weather_synonyms() {
        assert_eq!(Weather::parse("storm").unwrap().to_string(), "thunder");
        assert_eq!(Weather::parse("Sunny").unwrap(), Weather::Clear);
        assert_eq!(Weather::parse("rainy").unwrap(), Weather::Rain);
        assert!(matches!(Weather::parse("snow"), Err(ToolError::UnsupportedWeather(_))));
        assert!(matches!(Weather::parse(""), Err(ToolError::Missing(_))));
    }
}
