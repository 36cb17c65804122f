mod easter_eggs;
mod teleport;
mod world;

pub use easter_eggs::Effect;
pub use teleport::Teleport;
pub use world::{TimeOfDay, Weather};

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::console::Console;
use crate::error::ToolError;
use crate::events::ChatEvent;
use crate::llm::{ToolCallRequest, ToolDefinition};

/// Feature flags deciding which tool groups the model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSettings {
    pub enable_tool_use: bool,
    pub enable_world_tools: bool,
    pub enable_easter_eggs: bool,
}

/// Every action the model can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Teleport,
    SetTime,
    SetWeather,
    Effect(Effect),
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Teleport => "teleport_player",
            ToolKind::SetTime => "set_time",
            ToolKind::SetWeather => "set_weather",
            ToolKind::Effect(effect) => effect.name(),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        let (description, parameters) = match self {
            ToolKind::Teleport => (
                "Teleport a Minecraft player to another player when they explicitly request it.",
                teleport::teleport_schema(),
            ),
            ToolKind::SetTime => (
                "Set the Minecraft world's time when players politely request it.",
                world::time_schema(),
            ),
            ToolKind::SetWeather => (
                "Change the Minecraft world's weather in response to friendly camper requests.",
                world::weather_schema(),
            ),
            ToolKind::Effect(effect) => (effect.description(), effect.schema()),
        };
        ToolDefinition {
            name: self.name(),
            description,
            parameters,
        }
    }

    /// Validates the raw JSON arguments and resolves them into an action.
    ///
    /// Pure: nothing is sent anywhere. Optional player arguments fall back to
    /// the speaker of `event`.
    pub fn plan(self, event: &ChatEvent, arguments: &str) -> Result<ToolAction, ToolError> {
        match self {
            ToolKind::Teleport => {
                let args: teleport::TeleportArguments = parse_arguments(arguments)?;
                let from = resolve_player(args.from_player.as_deref(), &event.player)?;
                let target = args
                    .target_player
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or(ToolError::Missing("target_player"))?;
                Ok(ToolAction::Teleport(Teleport {
                    from,
                    target: checked_player(target)?,
                }))
            }
            ToolKind::SetTime => {
                let args: world::TimeArguments = parse_arguments(arguments)?;
                let value = args.value.ok_or(ToolError::Missing("time value"))?;
                Ok(ToolAction::SetTime(TimeOfDay::parse(&value)?))
            }
            ToolKind::SetWeather => {
                let args: world::WeatherArguments = parse_arguments(arguments)?;
                let state = args.state.ok_or(ToolError::Missing("weather value"))?;
                Ok(ToolAction::SetWeather(Weather::parse(&state)?))
            }
            ToolKind::Effect(effect) => {
                let args: easter_eggs::PlayerArguments = parse_arguments(arguments)?;
                let player = resolve_player(args.player.as_deref(), &event.player)?;
                Ok(ToolAction::Effect { effect, player })
            }
        }
    }
}

/// A validated tool call, ready to be turned into console commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    Teleport(Teleport),
    SetTime(TimeOfDay),
    SetWeather(Weather),
    Effect { effect: Effect, player: String },
}

impl ToolAction {
    pub fn commands(&self) -> Vec<String> {
        match self {
            ToolAction::Teleport(teleport) => vec![teleport.command()],
            ToolAction::SetTime(time) => vec![format!("time set {time}")],
            ToolAction::SetWeather(weather) => vec![format!("weather {weather}")],
            ToolAction::Effect { effect, player } => effect.commands(player),
        }
    }

    /// Text returned to the model once the commands went through.
    pub fn summary(&self) -> String {
        match self {
            ToolAction::Teleport(teleport) => teleport.summary(),
            ToolAction::SetTime(time) => format!("World time set to {time}."),
            ToolAction::SetWeather(weather) => format!("Weather set to {weather}."),
            ToolAction::Effect { effect, player } => effect.summary(player),
        }
    }
}

/// The tools offered for one reply, with their dispatch table.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    definitions: Vec<ToolDefinition>,
    executors: HashMap<&'static str, ToolKind>,
}

impl ToolCatalog {
    /// Assembles the enabled tool groups. Empty when tool use is off.
    pub fn build(settings: &ToolSettings) -> Self {
        let mut catalog = Self::default();
        if !settings.enable_tool_use {
            return catalog;
        }
        catalog.register(ToolKind::Teleport);
        if settings.enable_world_tools {
            catalog.register(ToolKind::SetTime);
            catalog.register(ToolKind::SetWeather);
        }
        if settings.enable_easter_eggs {
            for effect in Effect::ALL {
                catalog.register(ToolKind::Effect(effect));
            }
        }
        catalog
    }

    fn register(&mut self, kind: ToolKind) {
        self.definitions.push(kind.definition());
        self.executors.insert(kind.name(), kind);
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<ToolKind> {
        self.executors.get(name).copied()
    }

    /// Validates `call` and sends its commands to `console`.
    ///
    /// Invalid arguments fail before the console is touched. Multi-command
    /// actions go out as one batch that stops at the first failing command.
    pub async fn execute(
        &self,
        kind: ToolKind,
        console: &dyn Console,
        event: &ChatEvent,
        call: &ToolCallRequest,
    ) -> Result<String, ToolError> {
        let action = kind.plan(event, &call.arguments)?;
        let summary = action.summary();
        info!(tool = kind.name(), requested_by = %event.player, "[BOT] {}", summary);
        match action.commands().as_slice() {
            [single] => console.send(single).await?,
            batch => console.send_batch(batch).await?,
        }
        Ok(summary)
    }
}

fn parse_arguments<T: DeserializeOwned>(raw: &str) -> Result<T, ToolError> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { "{}" } else { raw };
    Ok(serde_json::from_str(raw)?)
}

/// Uses `requested` when given, otherwise the speaker.
pub fn resolve_player(requested: Option<&str>, speaker: &str) -> Result<String, ToolError> {
    let player = requested
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| speaker.trim());
    if player.is_empty() {
        return Err(ToolError::Missing("player"));
    }
    checked_player(player)
}

/// Player names end up inside console commands; whitespace or control
/// characters could split one command into several.
pub fn checked_player(name: &str) -> Result<String, ToolError> {
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ToolError::InvalidPlayer(name.to_string()));
    }
    Ok(name.to_string())
}
