//! Console actions the dispatcher takes on its own, without asking the model.

use crate::agent::ToolInvocationRecord;
use crate::agent::tools::checked_player;
use crate::console::Console;
use crate::error::ToolError;
use crate::events::ChatEvent;

pub const RESCUE_REPLY: &str = "Golem guard incoming - stay behind the big buddy!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    /// Harmless lightning a few blocks ahead of a player after an alert.
    SafeLightning,
    /// An iron golem beside a player who called for rescue.
    GolemGuard,
}

impl ModerationAction {
    pub fn name(self) -> &'static str {
        match self {
            ModerationAction::SafeLightning => "moderation_safe_lightning",
            ModerationAction::GolemGuard => "golem_guard",
        }
    }

    pub fn command(self, player: &str) -> String {
        match self {
            ModerationAction::SafeLightning => {
                format!("execute at {player} run summon lightning_bolt ^ ^ ^3")
            }
            ModerationAction::GolemGuard => {
                format!("execute at {player} run summon iron_golem ~2 ~ ~")
            }
        }
    }

    fn outcome(self) -> &'static str {
        match self {
            ModerationAction::SafeLightning => "Safe lightning triggered ahead of player.",
            ModerationAction::GolemGuard => "Iron golem summoned beside player.",
        }
    }

    /// Sends the action for the speaker of `event` and returns its audit entry.
    pub async fn apply(
        self,
        console: &dyn Console,
        event: &ChatEvent,
    ) -> Result<ToolInvocationRecord, ToolError> {
        let player = event.player.trim();
        if player.is_empty() {
            return Err(ToolError::Missing("player"));
        }
        let player = checked_player(player)?;
        console.send(&self.command(&player)).await?;
        Ok(ToolInvocationRecord {
            name: self.name().to_string(),
            arguments: serde_json::json!({ "player": player }).to_string(),
            output: Some(self.outcome().to_string()),
            error: None,
        })
    }
}

/// True when the message is an explicit call for rescue addressed to the bot.
pub fn is_rescue_call(bot_name: &str, text: &str) -> bool {
    if bot_name.is_empty() {
        return false;
    }
    let name = bot_name.to_lowercase();
    let lower = text.to_lowercase();
    [
        format!("{name} to the rescue"),
        format!("{name}, help me"),
        format!("{name} help me"),
    ]
    .iter()
    .any(|phrase| lower.contains(phrase.as_str()))
}
