use crate::cli::args::OutputFormat;
use crate::core::log::LogEntry;
use crate::core::session::{SendResult, StatusSnapshot};
use crate::domain::config::{HexLinkConfig, HexPreset};
use crate::infrastructure::history::HistoryEntry;
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_status(&self, status: &StatusSnapshot) -> Result<(), OutputError>;
    fn write_send_result(&self, result: &SendResult) -> Result<(), OutputError>;
    fn write_presets(&self, presets: &[HexPreset]) -> Result<(), OutputError>;
    fn write_history(&self, history: &[HistoryEntry]) -> Result<(), OutputError>;
    fn write_config(&self, config: &HexLinkConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::HexLinkError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
    quiet: bool,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            quiet: false,
        }
    }

    /// Suppress informational messages; results and errors still print.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn json<T: Serialize + ?Sized>(value: &T) -> Result<String, OutputError> {
        Ok(serde_json::to_string_pretty(value)?)
    }

    pub fn render_status(&self, status: &StatusSnapshot) -> Result<String, OutputError> {
        match self.format {
            OutputFormat::Json => Self::json(status),
            OutputFormat::Text => {
                let mut out = match &status.connection_info {
                    Some(info) if status.connected => format!("Connected to {}\n", info),
                    _ => "Disconnected\n".to_string(),
                };
                if let Some(last) = status.last_activity {
                    out.push_str(&format!("Last activity: {}\n", last.format("%Y-%m-%d %H:%M:%S")));
                }
                for entry in &status.log {
                    out.push_str(&format_log_line(entry));
                    out.push('\n');
                }
                Ok(out.trim_end().to_string())
            }
            OutputFormat::Table => {
                let rows: Vec<LogTableRow> = status.log.iter().map(LogTableRow::from).collect();
                let state = if status.connected { "connected" } else { "disconnected" };
                let header = match &status.connection_info {
                    Some(info) => format!("Status: {} ({})", state, info),
                    None => format!("Status: {}", state),
                };
                Ok(format!("{}\n{}", header, Table::new(rows)))
            }
        }
    }

    pub fn render_send_result(&self, result: &SendResult) -> Result<String, OutputError> {
        match self.format {
            OutputFormat::Json => Self::json(result),
            OutputFormat::Text | OutputFormat::Table => {
                let mut out = String::new();
                if let (Some(success), Some(total)) = (result.success_count, result.total_count) {
                    out.push_str(&format!("Sent {}/{} successfully\n", success, total));
                }
                match (&result.response, &result.responses) {
                    (Some(response), _) => out.push_str(&format!("Response: {}", response)),
                    (None, Some(responses)) if !responses.is_empty() => {
                        for (index, response) in responses.iter().enumerate() {
                            out.push_str(&format!("Response {}: {}\n", index + 1, response));
                        }
                    }
                    _ => out.push_str("No response"),
                }
                Ok(out.trim_end().to_string())
            }
        }
    }

    pub fn render_presets(&self, presets: &[HexPreset]) -> Result<String, OutputError> {
        match self.format {
            OutputFormat::Json => Self::json(presets),
            OutputFormat::Text => Ok(presets
                .iter()
                .map(|preset| format!("{:<12} {:<14} {}", preset.name, preset.code, preset.description))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let rows: Vec<PresetTableRow> = presets.iter().map(PresetTableRow::from).collect();
                Ok(Table::new(rows).to_string())
            }
        }
    }

    pub fn render_history(&self, history: &[HistoryEntry]) -> Result<String, OutputError> {
        match self.format {
            OutputFormat::Json => Self::json(history),
            OutputFormat::Text if history.is_empty() => Ok("No recent connections".to_string()),
            OutputFormat::Text => Ok(history
                .iter()
                .map(|entry| {
                    format!(
                        "{}:{}  {}",
                        entry.host,
                        entry.port,
                        entry.connected_at.format("%Y-%m-%d %H:%M:%S")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let rows: Vec<HistoryTableRow> = history.iter().map(HistoryTableRow::from).collect();
                Ok(Table::new(rows).to_string())
            }
        }
    }

    pub fn render_config(&self, config: &HexLinkConfig) -> Result<String, OutputError> {
        match self.format {
            OutputFormat::Json => Self::json(config),
            OutputFormat::Text | OutputFormat::Table => Ok(toml::to_string_pretty(config)?),
        }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_status(&self, status: &StatusSnapshot) -> Result<(), OutputError> {
        println!("{}", self.render_status(status)?);
        Ok(())
    }

    fn write_send_result(&self, result: &SendResult) -> Result<(), OutputError> {
        println!("{}", self.render_send_result(result)?);
        Ok(())
    }

    fn write_presets(&self, presets: &[HexPreset]) -> Result<(), OutputError> {
        println!("{}", self.render_presets(presets)?);
        Ok(())
    }

    fn write_history(&self, history: &[HistoryEntry]) -> Result<(), OutputError> {
        println!("{}", self.render_history(history)?);
        Ok(())
    }

    fn write_config(&self, config: &HexLinkConfig) -> Result<(), OutputError> {
        println!("{}", self.render_config(config)?);
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        if self.quiet {
            return Ok(());
        }
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "[{}] {:<8} {}",
        entry.timestamp.format("%H:%M:%S%.3f"),
        entry.kind,
        entry.message
    )
}

/// Table row for an activity log entry
#[derive(Tabled)]
struct LogTableRow {
    time: String,
    r#type: String,
    message: String,
}

impl From<&LogEntry> for LogTableRow {
    fn from(entry: &LogEntry) -> Self {
        Self {
            time: entry.timestamp.format("%H:%M:%S%.3f").to_string(),
            r#type: entry.kind.to_string(),
            message: entry.message.clone(),
        }
    }
}

/// Table row for a preset
#[derive(Tabled)]
struct PresetTableRow {
    name: String,
    code: String,
    description: String,
}

impl From<&HexPreset> for PresetTableRow {
    fn from(preset: &HexPreset) -> Self {
        Self {
            name: preset.name.clone(),
            code: preset.code.clone(),
            description: preset.description.clone(),
        }
    }
}

/// Table row for a remembered connection
#[derive(Tabled)]
struct HistoryTableRow {
    host: String,
    port: u16,
    connected: String,
}

impl From<&HistoryEntry> for HistoryTableRow {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            host: entry.host.clone(),
            port: entry.port,
            connected: entry.connected_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
