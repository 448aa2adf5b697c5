// End-to-end tests over the real reqwest transport against a local HTTP stub.

use gyan::atoms::constants::FAILED_REPLY_TEXT;
use gyan::engine::dispatcher::{ResilientDispatcher, RetryPolicy};
use gyan::engine::identity::FirebaseIdentity;
use gyan::{AppConfig, ChatState, IdentityProvider, ReplyKind, Role, SubmitOutcome};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
struct Recorded {
    request_line: String,
    body: String,
}

/// Answers each connection with the next scripted (status, body) pair,
/// then `Connection: close`.
struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    async fn start(script: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let log = requests.clone();

        tokio::spawn(async move {
            let mut script = script.into_iter();
            while let Ok((mut socket, _)) = listener.accept().await {
                let recorded = read_request(&mut socket).await;
                log.lock().push(recorded);
                let (status, body) = script.next().unwrap_or((500, "{}"));
                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        StubServer { addr, requests }
    }

    fn base_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Recorded {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    }
}

fn config_for(base_url: String, max_retries: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.gemini.api_key = "test-key".into();
    config.gemini.model = "gemini-test".into();
    config.gemini.base_url = base_url;
    config.retry.max_retries = max_retries;
    config.retry.base_delay_ms = 1;
    config.http.request_timeout_secs = 10;
    config
}

fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

const REPLY: &str = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello from the stub"}]},"finishReason":"STOP"}]}"#;

#[tokio::test]
async fn chat_round_trip_with_one_retry() {
    install_crypto_provider();
    let server = StubServer::start(vec![(503, r#"{"error":{"message":"overloaded"}}"#), (200, REPLY)]).await;
    let state = Arc::new(ChatState::new());
    let session = gyan::connect(&config_for(server.base_url(), 5), state.clone()).unwrap();

    let outcome = session.submit("  Hi there  ").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Replied { kind: ReplyKind::Answered, text: "Hello from the stub".into() }
    );

    let seen = server.requests();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0].request_line,
        "POST /v1beta/models/gemini-test:generateContent?key=test-key HTTP/1.1"
    );
    let body: Value = serde_json::from_str(&seen[1].body).unwrap();
    assert_eq!(body, serde_json::json!({"contents":[{"role":"user","parts":[{"text":"Hi there"}]}]}));

    let turns = state.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role(), Role::Model);
    assert!(!state.is_busy());
}

#[tokio::test]
async fn client_error_is_not_retried() {
    install_crypto_provider();
    let server = StubServer::start(vec![(400, r#"{"error":{"message":"bad request"}}"#)]).await;
    let session = gyan::connect(&config_for(server.base_url(), 5), Arc::new(ChatState::new())).unwrap();

    let outcome = session.submit("hello").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Replied { kind: ReplyKind::Failed, text: FAILED_REPLY_TEXT.into() }
    );
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn persistent_server_errors_exhaust_budget() {
    install_crypto_provider();
    let server = StubServer::start(vec![(500, "{}"), (500, "{}"), (500, "{}"), (200, REPLY)]).await;
    let session = gyan::connect(&config_for(server.base_url(), 3), Arc::new(ChatState::new())).unwrap();

    assert_eq!(session.submit("hello").await.reply_kind(), Some(ReplyKind::Failed));
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn unreachable_host_fails_after_retries() {
    install_crypto_provider();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let session = gyan::connect(
        &config_for(format!("http://127.0.0.1:{}/v1beta", port), 2),
        Arc::new(ChatState::new()),
    )
    .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(30), session.submit("anyone there?"))
        .await
        .unwrap();
    assert_eq!(outcome.reply_kind(), Some(ReplyKind::Failed));
    assert!(!session.state().is_busy());
}

#[tokio::test]
async fn second_turn_resends_history() {
    install_crypto_provider();
    let server = StubServer::start(vec![(200, REPLY), (200, REPLY)]).await;
    let session = gyan::connect(&config_for(server.base_url(), 1), Arc::new(ChatState::new())).unwrap();

    session.submit("one").await;
    session.submit("two").await;

    let body: Value = serde_json::from_str(&server.requests()[1].body).unwrap();
    let roles: Vec<&str> = body["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "model", "user"]);
}

#[tokio::test]
async fn anonymous_sign_in_against_stub() {
    install_crypto_provider();
    let server = StubServer::start(vec![(200, r#"{"idToken":"t","localId":"anon-123","expiresIn":"3600"}"#)]).await;
    let config = config_for(server.base_url(), 1);
    let dispatcher = ResilientDispatcher::new(gyan::transport_for(&config).unwrap(), RetryPolicy::default());
    let identity = FirebaseIdentity::new(dispatcher, format!("http://{}/v1", server.addr), "fb-key");

    assert_eq!(identity.sign_in_anonymously().await.unwrap(), "anon-123");
    assert_eq!(
        server.requests()[0].request_line,
        "POST /v1/accounts:signUp?key=fb-key HTTP/1.1"
    );
}

#[test]
fn connect_rejects_missing_key() {
    let mut config = AppConfig::default();
    config.gemini.api_key.clear();
    assert!(gyan::connect(&config, Arc::new(ChatState::new())).is_err());
}
