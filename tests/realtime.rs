use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use rust_room_chat::api::ApiClient;
use rust_room_chat::common::types::User;
use rust_room_chat::common::{NetworkCommand, NetworkEvent};
use rust_room_chat::network::{BackendClient, ReconnectPolicy};
use rust_room_chat::storage::SessionStore;

const TOKEN: &str = "test-token";

fn test_user() -> User {
    User {
        id: "u1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
        max_attempts: 5,
    }
}

/// Mock server: một TcpListener trả lời cả HTTP (REST API) lẫn WebSocket.
/// Mỗi WebSocket handshake thành công được đẩy vào channel cho test điều khiển.
async fn spawn_mock_server(auth_ok: bool) -> (SocketAddr, mpsc::Receiver<WebSocketStream<TcpStream>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (ws_tx, ws_rx) = mpsc::channel(4);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let ws_tx = ws_tx.clone();
            tokio::spawn(async move {
                serve_connection(stream, ws_tx, auth_ok).await;
            });
        }
    });

    (addr, ws_rx)
}

async fn serve_connection(
    stream: TcpStream,
    ws_tx: mpsc::Sender<WebSocketStream<TcpStream>>,
    auth_ok: bool,
) {
    let mut head = [0u8; 1024];
    let Ok(peeked) = stream.peek(&mut head).await else {
        return;
    };
    let request_line = String::from_utf8_lossy(&head[..peeked]).to_string();

    if request_line.starts_with("GET /ws") {
        if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
            let _ = ws_tx.send(ws).await;
        }
    } else {
        respond_http(stream, &request_line, auth_ok).await;
    }
}

async fn respond_http(mut stream: TcpStream, request_line: &str, auth_ok: bool) {
    // Đọc hết headers trước khi trả lời.
    let mut buf = request_line.as_bytes().to_vec();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|window| window == b"\r\n\r\n") {
        let Ok(read) = stream.read(&mut chunk).await else {
            return;
        };
        if read == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..read]);
    }

    let (status, body) = if request_line.starts_with("POST /api/login") {
        if auth_ok {
            (
                "200 OK",
                format!(
                    r#"{{"token":"{TOKEN}","user":{{"id":"u1","name":"Ada","email":"ada@example.com"}}}}"#
                ),
            )
        } else {
            ("401 Unauthorized", r#"{"error":"Invalid credentials"}"#.to_string())
        }
    } else if request_line.starts_with("GET /api/rooms/") {
        ("200 OK", "[]".to_string())
    } else {
        ("404 Not Found", r#"{"error":"not found"}"#.to_string())
    };

    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
}

struct TestClient {
    commands: mpsc::Sender<NetworkCommand>,
    events: mpsc::Receiver<NetworkEvent>,
    db_path: PathBuf,
}

async fn spawn_client(addr: SocketAddr, dir: &Path, with_session: bool) -> TestClient {
    let db_path = dir.join("client.db");
    let sessions = SessionStore::with_path(&db_path).unwrap();
    if with_session {
        sessions.save_session(TOKEN, &test_user()).unwrap();
    }

    let api = ApiClient::new(format!("http://{addr}"));
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let client =
        BackendClient::new(event_tx, cmd_rx, api, sessions).with_reconnect_policy(fast_policy());
    tokio::spawn(async move {
        let _ = client.run().await;
    });

    TestClient {
        commands: cmd_tx,
        events: event_rx,
        db_path,
    }
}

async fn next_event(events: &mut mpsc::Receiver<NetworkEvent>) -> NetworkEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn next_ws(
    conns: &mut mpsc::Receiver<WebSocketStream<TcpStream>>,
) -> WebSocketStream<TcpStream> {
    timeout(Duration::from_secs(5), conns.recv())
        .await
        .expect("timed out waiting for websocket connection")
        .expect("server task exited")
}

async fn read_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("read error");
        if let WsMessage::Text(text) = message {
            return text;
        }
    }
}

#[tokio::test]
async fn join_and_send_round_trip() {
    let (addr, mut conns) = spawn_mock_server(true).await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = spawn_client(addr, dir.path(), true).await;

    client.commands.send(NetworkCommand::Connect).await.unwrap();
    let mut server_ws = next_ws(&mut conns).await;
    assert!(matches!(
        next_event(&mut client.events).await,
        NetworkEvent::Connected
    ));

    client
        .commands
        .send(NetworkCommand::JoinRoom {
            room_id: "r1".to_string(),
        })
        .await
        .unwrap();

    let frame: serde_json::Value = serde_json::from_str(&read_text(&mut server_ws).await).unwrap();
    assert_eq!(frame["type"], "join_room");
    assert_eq!(frame["room_id"], "r1");

    match next_event(&mut client.events).await {
        NetworkEvent::HistoryLoaded { room_id, messages } => {
            assert_eq!(room_id, "r1");
            assert!(messages.is_empty());
        }
        other => panic!("expected HistoryLoaded, got {other:?}"),
    }

    // Tin nhắn toàn whitespace không được gửi đi đâu cả.
    client
        .commands
        .send(NetworkCommand::SendMessage {
            room_id: "r1".to_string(),
            content: "   ".to_string(),
        })
        .await
        .unwrap();

    client
        .commands
        .send(NetworkCommand::SendMessage {
            room_id: "r1".to_string(),
            content: "hi".to_string(),
        })
        .await
        .unwrap();

    // Frame kế tiếp server nhận phải là "hi": không có frame nào cho whitespace.
    let frame: serde_json::Value = serde_json::from_str(&read_text(&mut server_ws).await).unwrap();
    assert_eq!(frame["type"], "send_message");
    assert_eq!(frame["message"]["room_id"], "r1");
    assert_eq!(frame["message"]["content"], "hi");
    assert_eq!(frame["message"]["sender_id"], "u1");
    let client_id = frame["message"]["client_id"].as_str().unwrap().to_string();

    // Optimistic echo về UI trước khi server xác nhận.
    match next_event(&mut client.events).await {
        NetworkEvent::MessageReceived(message) => {
            assert_eq!(message.sender_id, "u1");
            assert_eq!(message.content, "hi");
            assert_eq!(message.client_id.as_deref(), Some(client_id.as_str()));
        }
        other => panic!("expected optimistic MessageReceived, got {other:?}"),
    }

    // Server echo bản đã lưu, id do server cấp nhưng giữ nguyên client_id.
    let echo = serde_json::json!({
        "type": "message",
        "message": {
            "id": "srv-1",
            "room_id": "r1",
            "sender_id": "u1",
            "content": "hi",
            "created_at": 1_700_000_000i64,
            "client_id": client_id,
        }
    });
    server_ws
        .send(WsMessage::Text(echo.to_string()))
        .await
        .unwrap();

    match next_event(&mut client.events).await {
        NetworkEvent::MessageReceived(message) => {
            assert_eq!(message.id, "srv-1");
            assert_eq!(message.client_id.as_deref(), Some(client_id.as_str()));
        }
        other => panic!("expected server MessageReceived, got {other:?}"),
    }
}

#[tokio::test]
async fn reconnect_replays_join_after_connection_drop() {
    let (addr, mut conns) = spawn_mock_server(true).await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = spawn_client(addr, dir.path(), true).await;

    client.commands.send(NetworkCommand::Connect).await.unwrap();
    let mut first = next_ws(&mut conns).await;
    assert!(matches!(
        next_event(&mut client.events).await,
        NetworkEvent::Connected
    ));

    client
        .commands
        .send(NetworkCommand::JoinRoom {
            room_id: "r1".to_string(),
        })
        .await
        .unwrap();
    let frame: serde_json::Value = serde_json::from_str(&read_text(&mut first).await).unwrap();
    assert_eq!(frame["type"], "join_room");
    assert!(matches!(
        next_event(&mut client.events).await,
        NetworkEvent::HistoryLoaded { .. }
    ));

    // Server cắt kết nối đột ngột.
    drop(first);

    let mut saw_disconnect = false;
    let mut saw_reconnecting = false;
    loop {
        match next_event(&mut client.events).await {
            NetworkEvent::Disconnected { .. } => saw_disconnect = true,
            NetworkEvent::Reconnecting { .. } => saw_reconnecting = true,
            NetworkEvent::Connected => break,
            other => panic!("unexpected event while reconnecting: {other:?}"),
        }
    }
    assert!(saw_disconnect, "expected a Disconnected event");
    assert!(saw_reconnecting, "expected a Reconnecting event");

    // Kết nối mới phải replay join cho room đang mở rồi fetch lại lịch sử.
    let mut second = next_ws(&mut conns).await;
    let frame: serde_json::Value = serde_json::from_str(&read_text(&mut second).await).unwrap();
    assert_eq!(frame["type"], "join_room");
    assert_eq!(frame["room_id"], "r1");

    match next_event(&mut client.events).await {
        NetworkEvent::HistoryLoaded { room_id, .. } => assert_eq!(room_id, "r1"),
        other => panic!("expected HistoryLoaded after reconnect, got {other:?}"),
    }
}

#[tokio::test]
async fn login_persists_session_and_connects() {
    let (addr, mut conns) = spawn_mock_server(true).await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = spawn_client(addr, dir.path(), false).await;

    client
        .commands
        .send(NetworkCommand::Login {
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .unwrap();

    match next_event(&mut client.events).await {
        NetworkEvent::AuthSucceeded(user) => {
            assert_eq!(user.id, "u1");
            assert_eq!(user.email, "ada@example.com");
        }
        other => panic!("expected AuthSucceeded, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut client.events).await,
        NetworkEvent::Connected
    ));
    let _ws = next_ws(&mut conns).await;

    // Token và user record phải nằm trên đĩa cho lần khởi động sau.
    let store = SessionStore::with_path(&client.db_path).unwrap();
    let session = store.load_session().unwrap().expect("session should be persisted");
    assert_eq!(session.token, TOKEN);
    assert_eq!(session.user.id, "u1");
}

#[tokio::test]
async fn failed_login_surfaces_error_and_persists_nothing() {
    let (addr, _conns) = spawn_mock_server(false).await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = spawn_client(addr, dir.path(), false).await;

    client
        .commands
        .send(NetworkCommand::Login {
            email: "ada@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap();

    match next_event(&mut client.events).await {
        NetworkEvent::AuthFailed(message) => {
            assert!(!message.is_empty());
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected AuthFailed, got {other:?}"),
    }

    let store = SessionStore::with_path(&client.db_path).unwrap();
    assert!(store.load_session().unwrap().is_none());
}

#[tokio::test]
async fn logout_clears_persisted_session() {
    let (addr, mut conns) = spawn_mock_server(true).await;
    let dir = tempfile::tempdir().unwrap();
    let mut client = spawn_client(addr, dir.path(), true).await;

    client.commands.send(NetworkCommand::Connect).await.unwrap();
    let _ws = next_ws(&mut conns).await;
    assert!(matches!(
        next_event(&mut client.events).await,
        NetworkEvent::Connected
    ));

    client.commands.send(NetworkCommand::Logout).await.unwrap();
    assert!(matches!(
        next_event(&mut client.events).await,
        NetworkEvent::LoggedOut
    ));

    let store = SessionStore::with_path(&client.db_path).unwrap();
    assert!(store.load_session().unwrap().is_none());
}
