use std::error::Error;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use crate::api::{ApiClient, ApiError, AuthResponse};
use crate::common::types::User;
use crate::common::{ChatMessage, NetworkCommand, NetworkEvent};
use crate::storage::SessionStore;

use super::protocol::{ClientFrame, ServerFrame};
use super::reconnect::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsError = tokio_tungstenite::tungstenite::Error;

/// Lần reconnect đang chờ đến hạn.
struct PendingRetry {
    attempt: u32,
    deadline: Instant,
}

/// Backend worker: giữ toàn bộ IO bất đồng bộ (HTTP API, WebSocket, session
/// store). UI giao tiếp với worker qua hai kênh mpsc.
pub struct BackendClient {
    event_sender: mpsc::Sender<NetworkEvent>,
    command_receiver: mpsc::Receiver<NetworkCommand>,
    api: ApiClient,
    sessions: SessionStore,
    reconnect: ReconnectPolicy,
    user: Option<User>,
    joined_room: Option<String>,
    retry: Option<PendingRetry>,
}

impl BackendClient {
    pub fn new(
        event_sender: mpsc::Sender<NetworkEvent>,
        command_receiver: mpsc::Receiver<NetworkCommand>,
        api: ApiClient,
        sessions: SessionStore,
    ) -> Self {
        Self {
            event_sender,
            command_receiver,
            api,
            sessions,
            reconnect: ReconnectPolicy::default(),
            user: None,
            joined_room: None,
            retry: None,
        }
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error>> {
        self.restore_session();
        log::info!("Backend event loop started");

        // Realtime connection: mở khi login/Connect, đóng khi logout.
        let mut ws: Option<WsStream> = None;

        loop {
            let ws_active = ws.is_some();
            let retry_armed = self.retry.is_some();

            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command, &mut ws).await,
                        None => break,
                    }
                }
                frame = next_frame(&mut ws), if ws_active => {
                    self.handle_frame(frame, &mut ws).await;
                }
                _ = wait_for_retry(&self.retry), if retry_armed => {
                    self.try_reconnect(&mut ws).await;
                }
            }
        }

        Ok(())
    }

    fn restore_session(&mut self) {
        match self.sessions.load_session() {
            Ok(Some(session)) => {
                log::info!("Restored session for {}", session.user.email);
                self.api.set_token(Some(session.token));
                self.user = Some(session.user);
            }
            Ok(None) => {}
            Err(err) => log::warn!("Failed to load persisted session: {err}"),
        }
    }

    async fn handle_command(&mut self, command: NetworkCommand, ws: &mut Option<WsStream>) {
        match command {
            NetworkCommand::Login { email, password } => {
                let result = self.api.login(&email, &password).await;
                self.finish_auth(result, ws).await;
            }
            NetworkCommand::Register {
                name,
                email,
                password,
            } => {
                let result = self.api.register(&name, &email, &password).await;
                self.finish_auth(result, ws).await;
            }
            NetworkCommand::Connect => {
                if self.api.token().is_none() {
                    log::warn!("Connect requested without a stored token; ignoring");
                    return;
                }
                self.ensure_connected(ws).await;
            }
            NetworkCommand::CreateRoom => match self.api.create_room().await {
                Ok(handle) => self.emit(NetworkEvent::RoomCreated(handle)).await,
                Err(err) => log::warn!("Failed to create room: {err}"),
            },
            NetworkCommand::JoinRoom { room_id } => {
                self.handle_join(room_id, ws).await;
            }
            NetworkCommand::SendMessage { room_id, content } => {
                self.handle_send(room_id, content, ws).await;
            }
            NetworkCommand::Logout => {
                self.handle_logout(ws).await;
            }
        }
    }

    async fn finish_auth(&mut self, result: Result<AuthResponse, ApiError>, ws: &mut Option<WsStream>) {
        match result {
            Ok(auth) => {
                if let Err(err) = self.sessions.save_session(&auth.token, &auth.user) {
                    log::warn!("Failed to persist session: {err}");
                }
                self.api.set_token(Some(auth.token));
                self.user = Some(auth.user.clone());
                self.emit(NetworkEvent::AuthSucceeded(auth.user)).await;
                self.ensure_connected(ws).await;
            }
            Err(err) => {
                self.emit(NetworkEvent::AuthFailed(err.to_string())).await;
            }
        }
    }

    async fn ensure_connected(&mut self, ws: &mut Option<WsStream>) -> bool {
        if ws.is_some() {
            return true;
        }
        match open_socket(&self.api).await {
            Ok(stream) => {
                *ws = Some(stream);
                self.retry = None;
                self.emit(NetworkEvent::Connected).await;
                true
            }
            Err(err) => {
                self.connection_lost(ws, format!("connect failed: {err}"))
                    .await;
                false
            }
        }
    }

    /// Join flow: đánh dấu room trước, mở kết nối nếu cần, leave room cũ,
    /// emit join event (không chờ ack) rồi fetch lịch sử qua HTTP.
    async fn handle_join(&mut self, room_id: String, ws: &mut Option<WsStream>) {
        if self.api.token().is_none() {
            log::warn!("JoinRoom without a logged-in session; ignoring");
            return;
        }

        let previous = self.joined_room.replace(room_id.clone());
        if !self.ensure_connected(ws).await {
            // Reconnect sẽ replay join khi nối lại được.
            return;
        }

        if let Some(previous) = previous {
            if previous != room_id {
                self.send_frame(ws, &ClientFrame::LeaveRoom { room_id: previous })
                    .await;
            }
        }

        self.send_frame(
            ws,
            &ClientFrame::JoinRoom {
                room_id: room_id.clone(),
            },
        )
        .await;
        self.load_history(&room_id).await;
    }

    async fn load_history(&mut self, room_id: &str) {
        match self.api.room_messages(room_id).await {
            Ok(messages) => {
                self.emit(NetworkEvent::HistoryLoaded {
                    room_id: room_id.to_string(),
                    messages,
                })
                .await;
            }
            // Danh sách để trống; người dùng vẫn chat được.
            Err(err) => log::warn!("Failed to fetch history for room {room_id}: {err}"),
        }
    }

    async fn handle_send(&mut self, room_id: String, content: String, ws: &mut Option<WsStream>) {
        let content = content.trim().to_string();
        if content.is_empty() {
            // Tin nhắn trắng: no-op, không đụng tới socket.
            return;
        }
        let Some(user) = self.user.clone() else {
            log::warn!("SendMessage without a logged-in session; dropping");
            return;
        };
        if ws.is_none() {
            log::warn!("Realtime connection not open; dropping message");
            return;
        }

        let client_id = Uuid::new_v4().to_string();
        let message = ChatMessage {
            id: client_id.clone(),
            room_id,
            sender_id: user.id,
            content,
            created_at: Utc::now().timestamp(),
            client_id: Some(client_id),
        };

        let sent = self
            .send_frame(
                ws,
                &ClientFrame::SendMessage {
                    message: message.clone(),
                },
            )
            .await;
        if sent {
            // Optimistic echo: UI hiển thị ngay, server echo cùng client_id
            // sẽ thay thế bản này.
            self.emit(NetworkEvent::MessageReceived(message)).await;
        }
    }

    async fn handle_logout(&mut self, ws: &mut Option<WsStream>) {
        if let Some(mut stream) = ws.take() {
            if let Err(err) = stream.close(None).await {
                log::debug!("Error closing realtime connection: {err}");
            }
        }
        self.joined_room = None;
        self.retry = None;
        self.user = None;
        self.api.set_token(None);
        if let Err(err) = self.sessions.clear_session() {
            log::warn!("Failed to clear persisted session: {err}");
        }
        self.emit(NetworkEvent::LoggedOut).await;
    }

    async fn handle_frame(
        &mut self,
        frame: Option<Result<WsMessage, WsError>>,
        ws: &mut Option<WsStream>,
    ) {
        match frame {
            Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(ServerFrame::Message { message }) => {
                    // UI chịu trách nhiệm lọc theo room đang join.
                    let _ = self
                        .event_sender
                        .send(NetworkEvent::MessageReceived(message))
                        .await;
                }
                Err(err) => log::debug!("Ignoring unrecognized frame: {err}"),
            },
            Some(Ok(WsMessage::Ping(payload))) => {
                if let Some(stream) = ws.as_mut() {
                    if let Err(err) = stream.send(WsMessage::Pong(payload)).await {
                        log::warn!("Failed to answer ping: {err}");
                    }
                }
            }
            Some(Ok(WsMessage::Close(_))) | None => {
                self.connection_lost(ws, "connection closed by server".to_string())
                    .await;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                self.connection_lost(ws, format!("connection error: {err}"))
                    .await;
            }
        }
    }

    async fn send_frame(&mut self, ws: &mut Option<WsStream>, frame: &ClientFrame) -> bool {
        let payload = match serde_json::to_string(frame) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("Failed to serialize frame: {err}");
                return false;
            }
        };
        let Some(stream) = ws.as_mut() else {
            log::warn!("Realtime connection not open; dropping frame");
            return false;
        };
        if let Err(err) = stream.send(WsMessage::Text(payload)).await {
            log::warn!("Failed to send frame: {err}");
            self.connection_lost(ws, format!("send failed: {err}")).await;
            return false;
        }
        true
    }

    async fn connection_lost(&mut self, ws: &mut Option<WsStream>, reason: String) {
        *ws = None;
        log::warn!("Realtime connection lost: {reason}");
        self.emit(NetworkEvent::Disconnected { reason }).await;
        if self.user.is_none() {
            return;
        }
        self.schedule_retry(1).await;
    }

    async fn schedule_retry(&mut self, attempt: u32) {
        if attempt > self.reconnect.max_attempts {
            log::warn!(
                "Giving up after {} reconnect attempts",
                self.reconnect.max_attempts
            );
            self.retry = None;
            self.emit(NetworkEvent::Disconnected {
                reason: format!("gave up after {} attempts", self.reconnect.max_attempts),
            })
            .await;
            return;
        }

        let delay = self.reconnect.delay_for(attempt);
        self.emit(NetworkEvent::Reconnecting {
            attempt,
            delay_ms: delay.as_millis() as u64,
        })
        .await;
        self.retry = Some(PendingRetry {
            attempt,
            deadline: Instant::now() + delay,
        });
    }

    async fn try_reconnect(&mut self, ws: &mut Option<WsStream>) {
        let Some(pending) = self.retry.take() else {
            return;
        };
        match open_socket(&self.api).await {
            Ok(stream) => {
                *ws = Some(stream);
                self.emit(NetworkEvent::Connected).await;
                if let Some(room_id) = self.joined_room.clone() {
                    // Replay join và fetch lại lịch sử để danh sách hiển thị
                    // khớp với server sau khoảng mất kết nối.
                    self.send_frame(
                        ws,
                        &ClientFrame::JoinRoom {
                            room_id: room_id.clone(),
                        },
                    )
                    .await;
                    self.load_history(&room_id).await;
                }
            }
            Err(err) => {
                log::warn!("Reconnect attempt {} failed: {err}", pending.attempt);
                self.schedule_retry(pending.attempt + 1).await;
            }
        }
    }

    async fn emit(&mut self, event: NetworkEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to emit event to UI: {err}");
        }
    }
}

async fn next_frame(ws: &mut Option<WsStream>) -> Option<Result<WsMessage, WsError>> {
    match ws.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_for_retry(retry: &Option<PendingRetry>) {
    match retry {
        Some(pending) => sleep_until(pending.deadline).await,
        None => std::future::pending().await,
    }
}

async fn open_socket(api: &ApiClient) -> Result<WsStream, WsError> {
    let mut request = api.websocket_url().into_client_request()?;
    if let Some(token) = api.token() {
        match format!("Bearer {token}").parse::<http::HeaderValue>() {
            Ok(value) => {
                request.headers_mut().insert(http::header::AUTHORIZATION, value);
            }
            Err(err) => log::warn!("Skipping malformed auth header: {err}"),
        }
    }
    let (stream, _) = connect_async(request).await?;
    Ok(stream)
}
