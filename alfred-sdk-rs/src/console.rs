use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ConsoleError;

/// Where commands for the running game server are written.
///
/// Exactly one task owns a console at a time, so commands never interleave.
#[async_trait]
pub trait Console: Send + Sync {
    /// Writes one command line into the console session.
    async fn send(&self, command: &str) -> Result<(), ConsoleError>;

    /// Runs `commands` in order and stops at the first failure.
    ///
    /// Commands already sent stay applied; nothing is rolled back.
    async fn send_batch(&self, commands: &[String]) -> Result<(), ConsoleError> {
        for command in commands {
            self.send(command).await?;
        }
        Ok(())
    }
}

/// Injects commands into a detached GNU `screen` session.
pub struct ScreenConsole {
    session: String,
}

impl ScreenConsole {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }
}

#[async_trait]
impl Console for ScreenConsole {
    async fn send(&self, command: &str) -> Result<(), ConsoleError> {
        debug!("screen[{}] <- {}", self.session, command);
        let status = Command::new("screen")
            .args(["-S", self.session.as_str(), "-p", "0", "-X", "stuff"])
            .arg(format!("{command}\r"))
            .kill_on_drop(true)
            .status()
            .await?;
        if !status.success() {
            return Err(ConsoleError::Rejected {
                session: self.session.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Collapses newlines to spaces and trims. An empty result is rejected.
pub fn sanitize_reply(reply: &str) -> Result<String, ConsoleError> {
    let flat = reply.replace(['\r', '\n'], " ");
    let trimmed = flat.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::EmptyReply);
    }
    Ok(trimmed.to_string())
}

/// The `say` command that posts `reply` in chat under the bot's name.
pub fn say_command(bot_name: &str, reply: &str) -> Result<String, ConsoleError> {
    Ok(format!("say [{}] {}", bot_name, sanitize_reply(reply)?))
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingConsole;
    use super::*;

    #[test]
    fn test_sanitize_collapses_newlines() {
        assert_eq!(sanitize_reply("  line one\nline two\r\n").unwrap(), "line one line two");
    }

    #[test]
    fn test_sanitize_rejects_blank_reply() {
        assert!(matches!(sanitize_reply(" \n \n"), Err(ConsoleError::EmptyReply)));
    }

    #[test]
    fn test_say_command_format() {
        assert_eq!(
            say_command("Alfred", "Torches keep\nmobs away!").unwrap(),
            "say [Alfred] Torches keep mobs away!"
        );
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let console = RecordingConsole::failing_on(2);
        let commands = vec![
            "effect give Steve slow_falling 10 0 true".to_string(),
            "tp Steve ~ 200 ~".to_string(),
            "say done".to_string(),
        ];
        let result = console.send_batch(&commands).await;
        assert!(result.is_err());
        // The first command stays sent and the third is never issued.
        assert_eq!(console.commands(), vec!["effect give Steve slow_falling 10 0 true"]);
        assert_eq!(*console.attempts.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_screen_console_reports_missing_session() {
        // Fails either because screen is not installed or the session does not exist.
        let console = ScreenConsole::new("alfred-test-no-such-session");
        assert!(console.send("say hi").await.is_err());
    }
}
