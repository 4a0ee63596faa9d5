use crate::cli::args::{Args, Command, ConfigCommand, SendArgs, ServeArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::session::{SessionManager, MAX_REPEAT_COUNT};
use crate::core::transport::HexTransport;
use crate::domain::config::HexLinkConfig;
use crate::domain::error::{HexLinkError, HexLinkResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::history::HistoryStore;
use crate::infrastructure::http;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::tcp::EchoServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;

/// Execute CLI command
pub async fn execute_command(args: Args) -> HexLinkResult<()> {
    let writer = ConsoleWriter::new(args.output).quiet(args.quiet);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose).map_err(|e| HexLinkError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;
    }

    match args.command {
        Command::Serve(serve_args) => execute_serve(serve_args, config, &writer).await,
        Command::Send(send_args) => execute_send(send_args, &config, &writer).await,
        Command::Console => {
            let manager = build_manager(&config);
            let stdin = BufReader::new(tokio::io::stdin());
            run_console(stdin, &manager, &config, &writer).await
        }
        Command::Echo { bind, port } => {
            let mut server = EchoServer::new(&format!("{}:{}", bind, port)).await?;
            writer.write_message(&format!(
                "Echo server listening on {} (Press Ctrl+C to stop)",
                server.get_bind_addr()
            ))?;
            server.run_until_ctrl_c().await
        }
        Command::Presets => {
            writer.write_presets(&config.all_presets())?;
            Ok(())
        }
        Command::History => {
            let store = HistoryStore::in_config_dir(config.global.history_limit)?;
            writer.write_history(&store.load())?;
            Ok(())
        }
        Command::Config(config_args) => match config_args.command {
            ConfigCommand::Show => {
                writer.write_config(&config)?;
                Ok(())
            }
            ConfigCommand::Init { dir } => {
                let dir: PathBuf = match dir {
                    Some(dir) => dir.into(),
                    None => std::env::current_dir().map_err(|e| HexLinkError::Config {
                        message: format!("Failed to get current directory: {}", e),
                    })?,
                };
                let path = config_manager.init_project_config(&dir)?;
                writer.write_message(&format!(
                    "Project configuration initialized at '{}'",
                    path.display()
                ))?;
                Ok(())
            }
            ConfigCommand::Path => {
                writer.write_message(&format!(
                    "Global: {}",
                    config_manager.get_global_config_path_ref().display()
                ))?;
                match config_manager.get_project_config_path() {
                    Some(path) => writer.write_message(&format!("Project: {}", path.display()))?,
                    None => writer.write_message("Project: (none)")?,
                }
                Ok(())
            }
        },
        Command::Version => {
            writer.write_message(&format!("hexlink {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Session manager backed by TCP, remembering connections when possible.
fn build_manager(config: &HexLinkConfig) -> SessionManager {
    let manager = SessionManager::new(config);
    match HistoryStore::in_config_dir(config.global.history_limit) {
        Ok(store) => manager.with_history(store),
        Err(e) => {
            warn!("Connection history disabled: {}", e);
            manager
        }
    }
}

/// Preset names resolve to their code; anything else is taken as hex.
fn resolve_hex(config: &HexLinkConfig, text: &str) -> String {
    config
        .find_preset(text.trim())
        .map(|preset| preset.code)
        .unwrap_or_else(|| text.to_string())
}

fn check_repeat(count: u32) -> HexLinkResult<u32> {
    if (1..=MAX_REPEAT_COUNT).contains(&count) {
        Ok(count)
    } else {
        Err(HexLinkError::InvalidInput(format!(
            "Repeat count must be between 1 and {}",
            MAX_REPEAT_COUNT
        )))
    }
}

async fn execute_serve(
    args: ServeArgs,
    mut config: HexLinkConfig,
    writer: &ConsoleWriter,
) -> HexLinkResult<()> {
    if let Some(bind) = args.bind {
        config.http.bind = bind;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    let manager = Arc::new(build_manager(&config));
    writer.write_message(&format!(
        "Serving HTTP API on {}:{} (Press Ctrl+C to stop)",
        config.http.bind, config.http.port
    ))?;

    http::serve(Arc::clone(&manager), &config.http).await?;
    manager.disconnect().await;
    Ok(())
}

async fn execute_send(
    args: SendArgs,
    config: &HexLinkConfig,
    writer: &ConsoleWriter,
) -> HexLinkResult<()> {
    let repeat = check_repeat(args.repeat)?;
    let hex = resolve_hex(config, &args.hex);
    let manager = build_manager(config);

    manager.connect(&args.host, args.port).await?;
    let result = manager.send_hex(&hex, repeat).await;
    manager.disconnect().await;

    writer.write_send_result(&result?)?;
    Ok(())
}

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect { host: String, port: u32 },
    Send { hex: String },
    Repeat { count: u32, hex: String },
    Status,
    Disconnect,
    Presets,
    History,
    Help,
    Quit,
}

const CONSOLE_HELP: &str = "\
Commands:
  connect <host> <port>     open the session
  send <hex|preset>         send once and show the reply
  repeat <n> <hex|preset>   send n times (1-100)
  status                    connection state and recent log
  disconnect                close the session
  presets                   list hex presets
  history                   recent connections
  quit                      disconnect and exit";

/// Parse a console line. Blank lines yield `None`.
pub fn parse_console_line(line: &str) -> HexLinkResult<Option<ConsoleCommand>> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "connect" => {
            let mut parts = rest.split_whitespace();
            let (host, port) = match (parts.next(), parts.next(), parts.next()) {
                (Some(host), Some(port), None) => (host, port),
                _ => return Err(HexLinkError::InvalidInput("usage: connect <host> <port>".to_string())),
            };
            let port = port
                .parse()
                .map_err(|_| HexLinkError::InvalidEndpoint(format!("invalid port '{}'", port)))?;
            ConsoleCommand::Connect {
                host: host.to_string(),
                port,
            }
        }
        "send" if rest.is_empty() => {
            return Err(HexLinkError::InvalidInput("usage: send <hex|preset>".to_string()))
        }
        "send" => ConsoleCommand::Send {
            hex: rest.to_string(),
        },
        "repeat" => {
            let (count, hex) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| HexLinkError::InvalidInput("usage: repeat <n> <hex|preset>".to_string()))?;
            let count = count
                .parse()
                .map_err(|_| HexLinkError::InvalidInput(format!("invalid repeat count '{}'", count)))?;
            ConsoleCommand::Repeat {
                count: check_repeat(count)?,
                hex: hex.trim().to_string(),
            }
        }
        "status" => ConsoleCommand::Status,
        "disconnect" => ConsoleCommand::Disconnect,
        "presets" => ConsoleCommand::Presets,
        "history" => ConsoleCommand::History,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => {
            return Err(HexLinkError::InvalidInput(format!(
                "unknown command '{}', try 'help'",
                other
            )))
        }
    };

    Ok(Some(command))
}

/// Line-oriented operator console over `input`.
///
/// Errors from a single command are reported and the loop continues. The
/// session is closed on `quit` or end of input.
pub async fn run_console<R, T, W>(
    input: R,
    manager: &SessionManager<T>,
    config: &HexLinkConfig,
    writer: &W,
) -> HexLinkResult<()>
where
    R: AsyncBufRead + Unpin,
    T: HexTransport,
    W: OutputWriter,
{
    writer.write_message("HexLink console. Type 'help' for commands.")?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_console_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writer.write_error(&e.to_string())?;
                continue;
            }
        };

        if command == ConsoleCommand::Quit {
            break;
        }

        if let Err(e) = run_console_command(command, manager, config, writer).await {
            writer.write_error(&e.to_string())?;
        }
    }

    if manager.status().connected {
        manager.disconnect().await;
    }
    Ok(())
}

async fn run_console_command<T, W>(
    command: ConsoleCommand,
    manager: &SessionManager<T>,
    config: &HexLinkConfig,
    writer: &W,
) -> HexLinkResult<()>
where
    T: HexTransport,
    W: OutputWriter,
{
    match command {
        ConsoleCommand::Connect { host, port } => {
            manager.connect(&host, port).await?;
            writer.write_message(&format!("Connected to {}:{}", host, port))?;
        }
        ConsoleCommand::Send { hex } => {
            let result = manager.send_hex(&resolve_hex(config, &hex), 1).await?;
            writer.write_send_result(&result)?;
        }
        ConsoleCommand::Repeat { count, hex } => {
            let result = manager.send_hex(&resolve_hex(config, &hex), count).await?;
            writer.write_send_result(&result)?;
        }
        ConsoleCommand::Status => writer.write_status(&manager.status())?,
        ConsoleCommand::Disconnect => {
            manager.disconnect().await;
            writer.write_message("Disconnected")?;
        }
        ConsoleCommand::Presets => writer.write_presets(manager.presets())?,
        ConsoleCommand::History => writer.write_history(&manager.history().await)?,
        ConsoleCommand::Help => writer.write_message(CONSOLE_HELP)?,
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::OutputError;
    use crate::core::session::{SendResult, StatusSnapshot, TcpSession};
    use crate::domain::config::{HexPreset, ReplyWait, SessionConfig};
    use crate::infrastructure::history::HistoryEntry;
    use std::sync::Mutex;

    /// Collects everything written so tests can inspect it.
    #[derive(Default)]
    struct RecordingWriter {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingWriter {
        fn push(&self, line: String) -> Result<(), OutputError> {
            self.lines.lock().unwrap().push(line);
            Ok(())
        }

        fn joined(&self) -> String {
            self.lines.lock().unwrap().join("\n")
        }
    }

    impl OutputWriter for RecordingWriter {
        fn write_status(&self, status: &StatusSnapshot) -> Result<(), OutputError> {
            self.push(format!("status connected={}", status.connected))
        }

        fn write_send_result(&self, result: &SendResult) -> Result<(), OutputError> {
            self.push(format!(
                "result {:?} {:?} {:?}",
                result.response, result.responses, result.success_count
            ))
        }

        fn write_presets(&self, presets: &[HexPreset]) -> Result<(), OutputError> {
            self.push(format!("presets {}", presets.len()))
        }

        fn write_history(&self, history: &[HistoryEntry]) -> Result<(), OutputError> {
            self.push(format!("history {}", history.len()))
        }

        fn write_config(&self, _config: &HexLinkConfig) -> Result<(), OutputError> {
            self.push("config".to_string())
        }

        fn write_message(&self, message: &str) -> Result<(), OutputError> {
            self.push(message.to_string())
        }

        fn write_error(&self, error: &str) -> Result<(), OutputError> {
            self.push(format!("error: {}", error))
        }
    }

    #[test]
    fn test_parse_console_lines() {
        assert_eq!(parse_console_line("   ").unwrap(), None);
        assert_eq!(
            parse_console_line("connect 10.0.0.5 502").unwrap(),
            Some(ConsoleCommand::Connect {
                host: "10.0.0.5".to_string(),
                port: 502
            })
        );
        assert_eq!(
            parse_console_line("send A0 01 01 A2").unwrap(),
            Some(ConsoleCommand::Send {
                hex: "A0 01 01 A2".to_string()
            })
        );
        assert_eq!(
            parse_console_line("REPEAT 3 ff 00 00").unwrap(),
            Some(ConsoleCommand::Repeat {
                count: 3,
                hex: "ff 00 00".to_string()
            })
        );
        assert_eq!(parse_console_line("exit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_console_rejects_bad_input() {
        assert!(parse_console_line("connect 10.0.0.5").is_err());
        assert!(parse_console_line("connect 10.0.0.5 port").is_err());
        assert!(parse_console_line("send").is_err());
        assert!(parse_console_line("repeat 0 A0").is_err());
        assert!(parse_console_line("repeat 101 A0").is_err());
        assert!(parse_console_line("launch").is_err());
    }

    #[test]
    fn test_resolve_hex_prefers_presets() {
        let config = HexLinkConfig::default();
        assert_eq!(resolve_hex(&config, "relay1 on"), "A0 01 01 A2");
        assert_eq!(resolve_hex(&config, "0A 0B"), "0A 0B");
    }

    #[tokio::test]
    async fn test_console_session_against_echo_server() {
        let mut server = EchoServer::new("127.0.0.1:0").await.unwrap();
        let port = server.get_bind_addr().port();
        server.start().await.unwrap();

        let session = SessionConfig {
            reply_wait: ReplyWait::Fixed { window_ms: 100 },
            repeat_pause_ms: 5,
            ..SessionConfig::default()
        };
        let manager = SessionManager::with_transport(TcpSession::new(session.clone()), &session);
        let config = HexLinkConfig::default();
        let writer = RecordingWriter::default();

        let script = format!(
            "status\nconnect 127.0.0.1 {}\nsend Relay1 ON\nrepeat 2 01 02 00\nbogus\nstatus\nquit\nstatus\n",
            port
        );
        run_console(script.as_bytes(), &manager, &config, &writer)
            .await
            .unwrap();

        let output = writer.joined();
        assert!(output.contains("status connected=false"));
        assert!(output.contains(&format!("Connected to 127.0.0.1:{}", port)));
        assert!(output.contains("result Some(\"A0 01 01 A2\")"));
        assert!(output.contains("Some(2)"));
        assert!(output.contains("error: Invalid input: unknown command 'bogus'"));
        assert!(output.contains("status connected=true"));
        // Nothing after quit runs and the session is closed
        assert_eq!(output.matches("status connected").count(), 2);
        assert!(!manager.status().connected);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_console_reports_send_without_connection() {
        let session = SessionConfig::default();
        let manager = SessionManager::with_transport(TcpSession::new(session.clone()), &session);
        let writer = RecordingWriter::default();

        run_console(&b"send A0\n"[..], &manager, &HexLinkConfig::default(), &writer)
            .await
            .unwrap();

        assert!(writer.joined().contains("error: Not connected"));
    }
}
