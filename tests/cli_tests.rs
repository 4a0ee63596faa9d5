use hexlink::infrastructure::tcp::EchoServer;
use std::path::Path;
use std::process::{Command, Output};
use std::str;
use tempfile::TempDir;

fn hexlink(home: &Path, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_hexlink"));
    command
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env_remove("RUST_LOG");
    command
}

fn run(home: &Path, args: &[&str]) -> Output {
    hexlink(home, args).output().expect("Failed to execute hexlink")
}

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_cli_help() {
        let home = TempDir::new().unwrap();
        let output = run(home.path(), &["--help"]);

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        assert!(stdout.contains("Usage:"));
        for command in ["serve", "send", "console", "echo", "presets", "history", "config"] {
            assert!(stdout.contains(command), "help is missing '{}'", command);
        }
    }

    #[test]
    fn test_cli_version() {
        let home = TempDir::new().unwrap();
        let output = run(home.path(), &["--quiet", "version"]);
        // Quiet suppresses informational output
        assert!(output.status.success());

        let output = run(home.path(), &["version"]);
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_presets_json() {
        let home = TempDir::new().unwrap();
        let output = run(home.path(), &["presets", "--output", "json"]);
        assert!(output.status.success());

        let presets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let presets = presets.as_array().unwrap();
        assert_eq!(presets.len(), 10);
        assert_eq!(presets[0]["code"], "A0 01 01 A2");
    }

    #[test]
    fn test_send_rejects_repeat_out_of_range() {
        let home = TempDir::new().unwrap();
        let output = run(home.path(), &["send", "127.0.0.1", "5020", "A0", "--repeat", "101"]);

        assert!(!output.status.success());
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");
        assert!(stderr.contains("Repeat count must be between 1 and 100"));
    }

    #[test]
    fn test_send_to_closed_port_fails() {
        let home = TempDir::new().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        drop(listener);

        let output = run(home.path(), &["--quiet", "send", "127.0.0.1", &port, "A0 01"]);
        assert!(!output.status.success());
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");
        assert!(stderr.contains("Failed to connect"));
    }

    #[test]
    fn test_config_init_creates_project_file() {
        let home = TempDir::new().unwrap();
        let project = home.path().join("project");
        std::fs::create_dir(&project).unwrap();

        let output = run(
            home.path(),
            &["config", "init", "--dir", project.to_str().unwrap()],
        );
        assert!(output.status.success());
        assert!(project.join(".hexlink").join("config.toml").exists());

        let output = run(&project, &["config", "path"]);
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(stdout.contains(".hexlink"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_against_echo_server_records_history() {
        let mut server = EchoServer::new("127.0.0.1:0").await.unwrap();
        let port = server.get_bind_addr().port().to_string();
        server.start().await.unwrap();

        let home = TempDir::new().unwrap();
        let home_path = home.path().to_path_buf();
        let send_port = port.clone();
        let output = tokio::task::spawn_blocking(move || {
            run(
                &home_path,
                &["--output", "json", "send", "127.0.0.1", &send_port, "relay1 off"],
            )
        })
        .await
        .unwrap();

        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["response"], "A0 01 00 A1");

        let output = run(home.path(), &["history", "--output", "json"]);
        let history: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(history[0]["host"], "127.0.0.1");
        assert_eq!(history[0]["port"].to_string(), port);

        server.stop().await.unwrap();
    }
}
