use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
pub(super) struct PlayerArguments {
    #[serde(default)]
    pub player: Option<String>,
}

/// Cosmetic effects centred on one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    FloatingCat,
    TinySlime,
    Skylift,
    CookieDrop,
    VillagerSound,
    Firework,
    GlowAura,
    HeartParticles,
    PoofSmoke,
}

impl Effect {
    pub const ALL: [Effect; 9] = [
        Effect::FloatingCat,
        Effect::TinySlime,
        Effect::Skylift,
        Effect::CookieDrop,
        Effect::VillagerSound,
        Effect::Firework,
        Effect::GlowAura,
        Effect::HeartParticles,
        Effect::PoofSmoke,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Effect::FloatingCat => "floating_cat",
            Effect::TinySlime => "tiny_slime",
            Effect::Skylift => "skylift_slowfall",
            Effect::CookieDrop => "drop_cookie",
            Effect::VillagerSound => "villager_sound",
            Effect::Firework => "mini_firework",
            Effect::GlowAura => "glowing_aura",
            Effect::HeartParticles => "heart_particles",
            Effect::PoofSmoke => "poof_smoke",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Effect::FloatingCat => "Summon a floating, motionless cat as a fun blessing.",
            Effect::TinySlime => "Spawn a tiny, stationary slime companion near the camper.",
            Effect::Skylift => "Lift a camper high into the sky while giving them slow falling.",
            Effect::CookieDrop => "Drop a celebratory cookie at the camper's feet.",
            Effect::VillagerSound => {
                "Play the classic villager 'hmm' near a camper for comedic effect."
            }
            Effect::Firework => "Launch a tiny firework celebration above a camper.",
            Effect::GlowAura => "Give a camper a short glowing outline.",
            Effect::HeartParticles => "Spawn a burst of heart particles around a camper.",
            Effect::PoofSmoke => "Create a cartoon-style poof of smoke near a camper.",
        }
    }

    pub(super) fn schema(self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "player": {
                    "type": "string",
                    "description": "Optional player to target (defaults to the speaker)."
                }
            }
        })
    }

    /// Console commands for the effect, in execution order.
    pub fn commands(self, player: &str) -> Vec<String> {
        match self {
            Effect::FloatingCat => vec![format!(
                "execute at {player} run summon cat ~ ~1 ~ {{NoAI:1b,NoGravity:1b,Silent:1b}}"
            )],
            Effect::TinySlime => vec![format!(
                "execute at {player} run summon slime ~ ~1 ~ {{Size:0,NoAI:1b,Silent:1b}}"
            )],
            Effect::Skylift => vec![
                format!("effect give {player} slow_falling 10 0 true"),
                format!("tp {player} ~ 200 ~"),
            ],
            Effect::CookieDrop => vec![format!(
                "execute at {player} run summon item ~ ~1 ~ {{Item:{{id:\"minecraft:cookie\",Count:1b}}}}"
            )],
            Effect::VillagerSound => vec![format!(
                "playsound minecraft:entity.villager.ambient player {player} ~ ~ ~ 1"
            )],
            Effect::Firework => vec![format!(
                "execute at {player} run summon firework_rocket ~ ~1 ~ {{LifeTime:20}}"
            )],
            Effect::GlowAura => vec![format!("effect give {player} minecraft:glowing 20 0 true")],
            Effect::HeartParticles => vec![format!(
                "execute at {player} run particle minecraft:heart ~ ~1 ~ 0.3 0.3 0.3 0 20"
            )],
            Effect::PoofSmoke => vec![format!(
                "execute at {player} run particle poof ~ ~1 ~ 0.3 0.3 0.3 0 15"
            )],
        }
    }

    pub fn summary(self, player: &str) -> String {
        match self {
            Effect::FloatingCat => format!("Summoned a floating cat near {player}."),
            Effect::TinySlime => format!("Tiny slime summoned near {player}."),
            Effect::Skylift => format!("{player} lifted sky-high with slow falling."),
            Effect::CookieDrop => format!("Cookie dropped for {player}."),
            Effect::VillagerSound => format!("Played villager hmm near {player}."),
            Effect::Firework => format!("Mini firework launched for {player}."),
            Effect::GlowAura => format!("{player} is now glowing briefly."),
            Effect::HeartParticles => format!("Heart sparkle burst for {player}."),
            Effect::PoofSmoke => format!("Poof of smoke near {player}."),
        }
    }
}
