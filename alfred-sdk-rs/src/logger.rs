use chrono::Local;
use colored::*;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: colored levels, local timestamps and
/// `key=value` fields after the message.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_writer(std::io::stdout)
        .event_format(BridgeFormatter)
        .init();
}

struct BridgeFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for BridgeFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string();
        let level = level_label(*event.metadata().level());

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        writeln!(writer, "{} {} {}", now.dimmed(), level, fields.render())
    }
}

fn level_label(level: tracing::Level) -> ColoredString {
    match level {
        tracing::Level::ERROR => "ERROR".red().bold(),
        tracing::Level::WARN => "WARN".yellow().bold(),
        tracing::Level::INFO => "INFO".green().bold(),
        tracing::Level::DEBUG => "DEBUG".blue().bold(),
        tracing::Level::TRACE => "TRACE".magenta().bold(),
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    pairs: Vec<(&'static str, String)>,
}

impl FieldCollector {
    fn render(&self) -> String {
        let mut out = self.message.clone();
        for (key, value) in &self.pairs {
            let _ = write!(out, " {}={}", key.cyan(), value);
        }
        out
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.pairs.push((field.name(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.pairs.push((field.name(), value.to_string()));
        }
    }
}
