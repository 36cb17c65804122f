//! The single consumer of chat events. It owns the cooldown state and is the
//! only writer to the console, so replies never interleave.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::tools::ToolCatalog;
use crate::agent::{Agent, ToolInvocationRecord};
use crate::audit::AuditLog;
use crate::config::Config;
use crate::console::{Console, say_command};
use crate::events::ChatEvent;
use crate::llm::ChatModel;
use crate::moderation::{ModerationAction, RESCUE_REPLY, is_rescue_call};
use crate::trigger::{Trigger, classify};

/// Capacity of the queue between the log watcher and the dispatcher.
pub const EVENT_QUEUE_CAPACITY: usize = 10;

/// When the last reply went out. Only stamped after a successful dispatch.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplyState {
    last_reply_at: Option<Instant>,
}

impl ReplyState {
    pub fn last_reply_at(&self) -> Option<Instant> {
        self.last_reply_at
    }

    /// Time left before another reply may be sent; zero when ready.
    pub fn remaining(&self, now: Instant, cooldown: Duration) -> Duration {
        match self.last_reply_at {
            Some(at) => cooldown.saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }

    fn stamp(&mut self, at: Instant) {
        self.last_reply_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No trigger fired.
    Ignored,
    /// A trigger fired inside the cooldown window.
    CoolingDown(Duration),
    Replied { text: String, tools: usize },
    /// The turn was abandoned and nothing was said.
    Failed,
}

enum Plan {
    Rescue,
    Model(Trigger),
}

pub struct ReplyDispatcher {
    config: Config,
    model: Arc<dyn ChatModel>,
    console: Arc<dyn Console>,
    audit: AuditLog,
    state: ReplyState,
}

impl ReplyDispatcher {
    pub fn new(
        config: Config,
        model: Arc<dyn ChatModel>,
        console: Arc<dyn Console>,
        audit: AuditLog,
    ) -> Self {
        Self {
            config,
            model,
            console,
            audit,
            state: ReplyState::default(),
        }
    }

    pub fn state(&self) -> &ReplyState {
        &self.state
    }

    /// Handles events one at a time until the queue closes or `cancel` fires.
    pub async fn run(&mut self, mut events: mpsc::Receiver<ChatEvent>, cancel: CancellationToken) {
        info!(
            "Dispatcher ready (cooldown {:?}, audit log {})",
            self.config.reply_cooldown,
            if self.audit.is_enabled() { "on" } else { "off" }
        );
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.handle_event(&event, &cancel).await;
        }
        info!("Dispatcher stopped");
    }

    pub async fn handle_event(&mut self, event: &ChatEvent, cancel: &CancellationToken) -> TurnOutcome {
        info!(player = %event.player, "Chat: {}", event.text);

        let triggers = &self.config.triggers;
        let plan = if self.config.tools.enable_easter_eggs
            && is_rescue_call(&triggers.bot_name, &event.text)
        {
            Plan::Rescue
        } else if let Some(trigger) = classify(triggers, event) {
            Plan::Model(trigger)
        } else {
            return TurnOutcome::Ignored;
        };

        let remaining = self.state.remaining(Instant::now(), self.config.reply_cooldown);
        if !remaining.is_zero() {
            info!(player = %event.player, "Cooling down, skipping reply ({:?} left)", remaining);
            return TurnOutcome::CoolingDown(remaining);
        }

        let turn_id = Uuid::new_v4();
        let (reply, tools) = match plan {
            Plan::Rescue => {
                info!(%turn_id, player = %event.player, "Rescue call heard");
                match ModerationAction::GolemGuard.apply(self.console.as_ref(), event).await {
                    Ok(record) => (RESCUE_REPLY.to_string(), vec![record]),
                    Err(e) => {
                        error!(%turn_id, "Golem guard failed: {}", e);
                        return TurnOutcome::Failed;
                    }
                }
            }
            Plan::Model(trigger) => {
                info!(%turn_id, player = %event.player, rule = ?trigger.rule, "Trigger fired");
                match self.converse(event, &trigger, cancel).await {
                    Some(turn) => turn,
                    None => return TurnOutcome::Failed,
                }
            }
        };

        let command = match say_command(&self.config.triggers.bot_name, &reply) {
            Ok(command) => command,
            Err(e) => {
                error!(%turn_id, "Reply not sendable: {}", e);
                return TurnOutcome::Failed;
            }
        };
        if let Err(e) = self.console.send(&command).await {
            error!(%turn_id, "Console dispatch failed: {}", e);
            return TurnOutcome::Failed;
        }
        self.state.stamp(Instant::now());
        info!(%turn_id, player = %event.player, "Replied: {}", reply);

        if let Err(e) = self.audit.append(event, &reply, &tools) {
            warn!(%turn_id, "Audit log write failed: {}", e);
        }
        TurnOutcome::Replied {
            text: reply,
            tools: tools.len(),
        }
    }

    /// Alert lightning, then the model conversation. `None` when the turn failed.
    async fn converse(
        &self,
        event: &ChatEvent,
        trigger: &Trigger,
        cancel: &CancellationToken,
    ) -> Option<(String, Vec<ToolInvocationRecord>)> {
        let mut tools = Vec::new();
        if trigger.is_alert() && self.config.enable_alert_lightning {
            match ModerationAction::SafeLightning
                .apply(self.console.as_ref(), event)
                .await
            {
                Ok(record) => tools.push(record),
                Err(e) => warn!(player = %event.player, "Moderation lightning failed: {}", e),
            }
        }

        let catalog = ToolCatalog::build(&self.config.tools);
        let agent = Agent::new(
            self.model.as_ref(),
            self.console.as_ref(),
            &self.config.system_prompt,
        );
        match agent.respond(event, &trigger.prompt, &catalog, cancel).await {
            Ok(turn) => {
                tools.extend(turn.invocations);
                Some((turn.text, tools))
            }
            Err(e) => {
                error!(player = %event.player, "Dropping event: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{ScriptedModel, text, tool_calls};
    use crate::console::testing::RecordingConsole;
    use crate::error::LlmError;
    use serde_json::Value;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "DEMETERICS_API_KEY" => Some("test-key".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn dispatcher(
        model: &Arc<ScriptedModel>,
        console: &Arc<RecordingConsole>,
        audit: AuditLog,
    ) -> ReplyDispatcher {
        ReplyDispatcher::new(config(), model.clone(), console.clone(), audit)
    }

    fn audit_lines(path: &Path) -> Vec<Value> {
        match fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_untriggered_chat_is_ignored() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::disabled());

        let outcome = dispatcher
            .handle_event(&ChatEvent::new("Steve", "nice base"), &CancellationToken::new())
            .await;
        assert_eq!(outcome, TurnOutcome::Ignored);
        assert_eq!(model.request_count(), 0);
        assert!(console.commands().is_empty());
    }

    #[tokio::test]
    async fn test_reply_is_said_and_audited() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("chat_history.log");
        let model = Arc::new(ScriptedModel::new(vec![text("  Torches keep mobs away!\n")]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::new(&log));

        let event = ChatEvent::new("Steve", "alfred how do I stop mobs?");
        let outcome = dispatcher.handle_event(&event, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            TurnOutcome::Replied {
                text: "Torches keep mobs away!".to_string(),
                tools: 0
            }
        );
        assert_eq!(console.commands(), vec!["say [Alfred] Torches keep mobs away!"]);
        assert!(dispatcher.state().last_reply_at().is_some());

        let lines = audit_lines(&log);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["player"], "Steve");
        assert_eq!(lines[0]["question"], "alfred how do I stop mobs?");
        assert_eq!(lines[0]["response"], "Torches keep mobs away!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_spaces_out_replies() {
        let model = Arc::new(ScriptedModel::new(vec![text("one"), text("two"), text("three")]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::disabled());
        let cancel = CancellationToken::new();
        let ask = ChatEvent::new("Steve", "anyone around?");

        assert!(matches!(
            dispatcher.handle_event(&ask, &cancel).await,
            TurnOutcome::Replied { .. }
        ));
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(5)).await;
            assert!(matches!(
                dispatcher.handle_event(&ask, &cancel).await,
                TurnOutcome::CoolingDown(_)
            ));
        }
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(matches!(
            dispatcher.handle_event(&ask, &cancel).await,
            TurnOutcome::Replied { .. }
        ));

        assert_eq!(model.request_count(), 2);
        let times = console.times();
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_dispatch_does_not_start_cooldown() {
        let model = Arc::new(ScriptedModel::new(vec![text("lost"), text("delivered")]));
        let console = Arc::new(RecordingConsole::failing_on(1));
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("chat.log");
        let mut dispatcher = dispatcher(&model, &console, AuditLog::new(&log));
        let cancel = CancellationToken::new();
        let ask = ChatEvent::new("Steve", "!bot hi");

        assert_eq!(dispatcher.handle_event(&ask, &cancel).await, TurnOutcome::Failed);
        assert!(dispatcher.state().last_reply_at().is_none());
        assert!(audit_lines(&log).is_empty());

        assert!(matches!(
            dispatcher.handle_event(&ask, &cancel).await,
            TurnOutcome::Replied { .. }
        ));
        assert_eq!(console.commands(), vec!["say [Alfred] delivered"]);
        assert_eq!(audit_lines(&log).len(), 1);
    }

    #[tokio::test]
    async fn test_alert_turn_audits_every_executed_tool() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("chat.log");
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(&[
                ("set_weather", r#"{"state":"rain"}"#),
                ("set_time", r#"{"value":"dusk"}"#),
            ]),
            text("Let's keep it kind, here's some rain to cool off."),
        ]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::new(&log));

        let event = ChatEvent::new("Steve", "you are dumb");
        let outcome = dispatcher.handle_event(&event, &CancellationToken::new()).await;
        assert!(matches!(outcome, TurnOutcome::Replied { tools: 3, .. }));

        assert_eq!(
            console.commands(),
            vec![
                "execute at Steve run summon lightning_bolt ^ ^ ^3",
                "weather rain",
                "say [Alfred] Let's keep it kind, here's some rain to cool off.",
            ]
        );
        let first_request = model.requests.lock().unwrap()[0].clone();
        assert!(first_request[1].content.contains("Gently remind about kindness"));

        let lines = audit_lines(&log);
        let tools = lines[0]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "moderation_safe_lightning");
        assert_eq!(tools[1]["name"], "set_weather");
        assert!(tools[1].get("error").is_none());
        assert_eq!(tools[2]["name"], "set_time");
        assert!(tools[2]["error"].is_string());
    }

    #[tokio::test]
    async fn test_rescue_call_skips_the_model() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("chat.log");
        let model = Arc::new(ScriptedModel::new(vec![]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::new(&log));

        let event = ChatEvent::new("Alex", "ALFRED TO THE RESCUE");
        let outcome = dispatcher.handle_event(&event, &CancellationToken::new()).await;
        assert!(matches!(outcome, TurnOutcome::Replied { tools: 1, .. }));
        assert_eq!(model.request_count(), 0);
        assert_eq!(
            console.commands(),
            vec![
                "execute at Alex run summon iron_golem ~2 ~ ~".to_string(),
                format!("say [Alfred] {RESCUE_REPLY}"),
            ]
        );
        assert_eq!(audit_lines(&log)[0]["tools"][0]["name"], "golem_guard");
    }

    #[tokio::test]
    async fn test_model_failure_drops_event_silently() {
        let model = Arc::new(ScriptedModel::new(vec![Err(LlmError::Status {
            status: "500 Internal Server Error".to_string(),
            body: "boom".to_string(),
        })]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::disabled());

        let outcome = dispatcher
            .handle_event(&ChatEvent::new("Steve", "alfred?"), &CancellationToken::new())
            .await;
        assert_eq!(outcome, TurnOutcome::Failed);
        assert!(console.commands().is_empty());
        assert!(dispatcher.state().last_reply_at().is_none());
    }

    #[tokio::test]
    async fn test_run_drains_queue_until_closed() {
        let model = Arc::new(ScriptedModel::new(vec![text("hello Steve")]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::disabled());

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        tx.send(ChatEvent::new("Steve", "nice base")).await.unwrap();
        tx.send(ChatEvent::new("Steve", "alfred hi")).await.unwrap();
        drop(tx);

        dispatcher.run(rx, CancellationToken::new()).await;
        assert_eq!(console.commands(), vec!["say [Alfred] hello Steve"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let console = Arc::new(RecordingConsole::default());
        let mut dispatcher = dispatcher(&model, &console, AuditLog::disabled());

        let (_tx, rx) = mpsc::channel::<ChatEvent>(EVENT_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();
        cancel.cancel();
        dispatcher.run(rx, cancel).await;
        assert!(console.commands().is_empty());
    }
}
