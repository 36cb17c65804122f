use std::sync::Arc;

use alfred_sdk_rs::audit::AuditLog;
use alfred_sdk_rs::config::Config;
use alfred_sdk_rs::console::ScreenConsole;
use alfred_sdk_rs::dispatcher::{ReplyDispatcher, EVENT_QUEUE_CAPACITY};
use alfred_sdk_rs::llm::LLM;
use alfred_sdk_rs::tail::{watch_chat, DEFAULT_POLL_INTERVAL};
use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    alfred_sdk_rs::logger::init_logging();

    let config = Config::from_env().context("loading configuration")?;
    info!(
        "Watching {} for chat, replying through screen session {} as {}",
        config.log_path.display(),
        config.screen_session,
        config.triggers.bot_name
    );

    let model = LLM::new(config.llm.clone()).context("building model client")?;
    let console = ScreenConsole::new(config.screen_session.clone());
    let audit = AuditLog::new(&config.response_log);

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    let watcher = tokio::spawn(watch_chat(
        config.log_path.clone(),
        tx,
        cancel.clone(),
        DEFAULT_POLL_INTERVAL,
    ));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!("Cannot listen for ctrl-c: {}", e),
        }
    });

    let mut dispatcher = ReplyDispatcher::new(config, Arc::new(model), Arc::new(console), audit);
    dispatcher.run(rx, cancel.clone()).await;

    cancel.cancel();
    match watcher.await {
        Ok(result) => result.context("chat log watcher failed")?,
        Err(e) => warn!("Chat log watcher task ended abnormally: {}", e),
    }
    Ok(())
}
