use serde::{Deserialize, Serialize};

use crate::common::types::ChatMessage;

/// Frame client gửi lên room server qua WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinRoom { room_id: String },
    LeaveRoom { room_id: String },
    SendMessage { message: ChatMessage },
}

/// Frame server đẩy xuống client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Message { message: ChatMessage },
}
