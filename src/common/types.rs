use serde::{Deserialize, Serialize};

/// Domain model đại diện một tin nhắn chat trong một room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: i64,
    /// Correlation id gắn vào tin nhắn gửi đi; bản optimistic được thay thế
    /// khi server echo về cùng client_id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Người dùng đã đăng nhập, trả về từ API auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Room mới tạo trên server, kèm link chia sẻ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomHandle {
    pub room_id: String,
    pub link: String,
}
