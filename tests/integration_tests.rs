use hexlink::core::log::LogKind;
use hexlink::domain::config::{ReplyWait, SessionConfig};
use hexlink::infrastructure::tcp::EchoServer;
use hexlink::{HexLinkConfig, HexLinkError, SessionManager, TcpSession};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// Integration tests for the HexLink session against real sockets
#[cfg(test)]
mod integration_tests {
    use super::*;

    async fn echo_server() -> (EchoServer, u16) {
        let mut server = EchoServer::new("127.0.0.1:0").await.expect("bind echo server");
        let port = server.get_bind_addr().port();
        server.start().await.expect("start echo server");
        (server, port)
    }

    fn fast_manager() -> SessionManager {
        let session = SessionConfig {
            reply_wait: ReplyWait::Fixed { window_ms: 150 },
            repeat_pause_ms: 10,
            ..SessionConfig::default()
        };
        SessionManager::with_transport(TcpSession::new(session.clone()), &session)
    }

    #[tokio::test]
    async fn test_connect_reports_endpoint_in_status() {
        let (mut server, port) = echo_server().await;
        let manager = fast_manager();

        assert!(manager.connect("127.0.0.1", port as u32).await.unwrap());

        let status = manager.status();
        assert!(status.connected);
        assert_eq!(status.connection_info, Some(format!("127.0.0.1:{}", port)));
        assert_eq!(
            status.server_info,
            Some(format!("Connected to TCP server at 127.0.0.1:{}", port))
        );

        manager.disconnect().await;
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_default_quiet_window_collects_echo() {
        let (mut server, port) = echo_server().await;
        let manager = SessionManager::new(&HexLinkConfig::default());
        manager.connect("127.0.0.1", port as u32).await.unwrap();

        let started = Instant::now();
        let result = manager.send_hex("A0 01 01 A2", 1).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));

        assert!(result.success);
        assert_eq!(result.response.as_deref(), Some("A0 01 01 A2"));

        let status = manager.status();
        let kinds: Vec<LogKind> = status.log.iter().map(|entry| entry.kind).collect();
        assert!(kinds.contains(&LogKind::Sent));
        assert!(kinds.contains(&LogKind::Received));
        assert!(status.last_activity.is_some());

        manager.disconnect().await;
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeat_send_collects_each_reply() {
        let (mut server, port) = echo_server().await;
        let manager = fast_manager();
        manager.connect("127.0.0.1", port as u32).await.unwrap();

        let result = manager.send_hex("ff 01 00", 4).await.unwrap();
        assert!(result.success);
        assert_eq!(result.success_count, Some(4));
        assert_eq!(result.total_count, Some(4));
        assert_eq!(result.responses, Some(vec!["FF 01 00".to_string(); 4]));

        manager.disconnect().await;
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_peer_is_not_an_error() {
        // Accepts and reads, never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 64];
            while let Ok(n) = stream.read(&mut buffer).await {
                if n == 0 {
                    break;
                }
            }
        });

        let manager = fast_manager();
        manager.connect("127.0.0.1", port as u32).await.unwrap();

        let result = manager.send_hex("01 01 01", 1).await.unwrap();
        assert!(result.success);
        assert!(result.response.is_none());

        manager.disconnect().await;
    }

    #[tokio::test]
    async fn test_send_without_connection_logs_error() {
        let manager = fast_manager();

        let err = manager.send_hex("A0 01", 1).await.unwrap_err();
        assert!(matches!(err, HexLinkError::NotConnected));

        let status = manager.status();
        let last = status.log.last().expect("log entry");
        assert_eq!(last.kind, LogKind::Error);
        assert_eq!(last.message, "Not connected. Cannot send data.");
    }

    #[tokio::test]
    async fn test_disconnect_twice_succeeds() {
        let (mut server, port) = echo_server().await;
        let manager = fast_manager();
        manager.connect("127.0.0.1", port as u32).await.unwrap();

        assert!(manager.disconnect().await);
        assert!(manager.disconnect().await);
        assert!(!manager.status().connected);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_within_bound() {
        let session = SessionConfig {
            connect_timeout_ms: 500,
            ..SessionConfig::default()
        };
        let manager = SessionManager::with_transport(TcpSession::new(session.clone()), &session);

        let started = Instant::now();
        let err = manager.connect("192.0.2.1", 9).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(matches!(
            err,
            HexLinkError::ConnectTimeout { .. } | HexLinkError::ConnectFailed { .. }
        ));
        assert!(!manager.status().connected);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_previous_session() {
        let (mut first, first_port) = echo_server().await;
        let (mut second, second_port) = echo_server().await;
        let manager = fast_manager();

        manager.connect("127.0.0.1", first_port as u32).await.unwrap();
        manager.connect("127.0.0.1", second_port as u32).await.unwrap();

        assert_eq!(
            manager.status().connection_info,
            Some(format!("127.0.0.1:{}", second_port))
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(first.get_client_count().await, 0);
        assert_eq!(second.get_client_count().await, 1);

        manager.disconnect().await;
        first.stop().await.unwrap();
        second.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_config_round_trip_through_toml() {
        let config = HexLinkConfig::default();
        let text = toml::to_string(&config).expect("serialize config");
        let parsed: HexLinkConfig = toml::from_str(&text).expect("parse config");

        assert_eq!(parsed.session.reply_wait, ReplyWait::Fixed { window_ms: 1000 });
        assert_eq!(parsed.http.port, config.http.port);
        assert_eq!(parsed.global.history_limit, config.global.history_limit);
    }
}
