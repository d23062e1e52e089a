use super::types::{ChatMessage, RoomHandle, User};

/// Sự kiện từ backend worker gửi lên UI.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    AuthSucceeded(User),
    /// Đăng nhập/đăng ký thất bại, kèm thông báo lỗi hiển thị trên form.
    AuthFailed(String),
    RoomCreated(RoomHandle),
    Connected,
    Disconnected {
        reason: String,
    },
    Reconnecting {
        attempt: u32,
        delay_ms: u64,
    },
    /// Lịch sử tin nhắn của room vừa join; UI thay thế toàn bộ danh sách.
    HistoryLoaded {
        room_id: String,
        messages: Vec<ChatMessage>,
    },
    MessageReceived(ChatMessage),
    LoggedOut,
}
