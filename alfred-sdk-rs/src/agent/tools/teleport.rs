use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
pub(super) struct TeleportArguments {
    #[serde(default)]
    pub target_player: Option<String>,
    #[serde(default)]
    pub from_player: Option<String>,
}

/// Moves `from` to the position of `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teleport {
    pub from: String,
    pub target: String,
}

impl Teleport {
    pub fn command(&self) -> String {
        format!("tp {} {}", self.from, self.target)
    }

    pub fn summary(&self) -> String {
        format!("Teleported {} to {}", self.from, self.target)
    }
}

pub(super) fn teleport_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "target_player": {
                "type": "string",
                "description": "Exact username the requester wants to teleport to."
            },
            "from_player": {
                "type": "string",
                "description": "Optional username to teleport from (defaults to the speaker)."
            }
        },
        "required": ["target_player"]
    })
}
