//! Append-only JSON Lines record of every answered chat event.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use serde::Serialize;

use crate::agent::ToolInvocationRecord;
use crate::error::AuditError;
use crate::events::ChatEvent;

#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    time: String,
    player: &'a str,
    question: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolInvocationRecord],
}

fn no_tools(tools: &&[ToolInvocationRecord]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    /// An empty path disables auditing.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            path: (!path.as_os_str().is_empty()).then(|| path.to_path_buf()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Appends one line for the answered `event`, creating the file if needed.
    pub fn append(
        &self,
        event: &ChatEvent,
        response: &str,
        tools: &[ToolInvocationRecord],
    ) -> Result<(), AuditError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let record = AuditRecord {
            time: event.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            player: &event.player,
            question: &event.text,
            response,
            tools,
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let write_err = |source| AuditError::Write {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_err)?;
        file.write_all(&line).map_err(write_err)
    }
}
