use crate::common::types::{ChatMessage, User};

/// Giữ tối đa chừng này tin nhắn trong bộ nhớ; phiên chạy dài sẽ evict tin cũ.
pub const MAX_MESSAGES: usize = 500;

/// Trạng thái kết nối realtime hiển thị trên thanh room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connectivity {
    Offline,
    Online,
    Reconnecting { attempt: u32 },
}

/// Form đăng nhập / đăng ký.
#[derive(Default)]
pub struct AuthForm {
    pub is_register: bool,
    pub name: String,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub busy: bool,
}

/// Trạng thái cục bộ của UI.
pub struct AppState {
    pub user: Option<User>,
    pub auth: AuthForm,
    pub connectivity: Connectivity,
    pub room_input: String,
    pub room_link: Option<String>,
    pub current_room: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub input_text: String,
}

impl AppState {
    pub fn new(user: Option<User>) -> Self {
        Self {
            user,
            auth: AuthForm::default(),
            connectivity: Connectivity::Offline,
            room_input: String::new(),
            room_link: None,
            current_room: None,
            messages: Vec::new(),
            input_text: String::new(),
        }
    }

    pub fn joined(&self) -> bool {
        self.current_room.is_some()
    }

    /// Bước đầu của join flow: đánh dấu room hiện tại và xóa sạch danh sách
    /// cũ để không còn tin nhắn sót lại từ room trước.
    pub fn begin_join(&mut self, room_id: String) {
        self.current_room = Some(room_id);
        self.messages.clear();
    }

    /// Thay thế toàn bộ danh sách bằng lịch sử server trả về. Fetch về muộn
    /// (sau khi user đã chuyển room khác) bị bỏ qua.
    pub fn replace_history(&mut self, room_id: &str, messages: Vec<ChatMessage>) {
        if self.current_room.as_deref() != Some(room_id) {
            return;
        }
        self.messages = messages;
        self.enforce_cap();
    }

    /// Append tin nhắn mới theo thứ tự đến, lọc theo room hiện tại. Server
    /// echo mang cùng client_id thay thế bản optimistic thay vì append.
    pub fn apply_message(&mut self, message: ChatMessage) {
        let Some(room) = self.current_room.as_deref() else {
            return;
        };
        if message.room_id != room {
            return;
        }

        if let Some(client_id) = message.client_id.as_deref() {
            if let Some(existing) = self
                .messages
                .iter_mut()
                .find(|m| m.client_id.as_deref() == Some(client_id))
            {
                *existing = message;
                return;
            }
        }

        self.messages.push(message);
        self.enforce_cap();
    }

    pub fn reset_after_logout(&mut self) {
        self.user = None;
        self.auth = AuthForm::default();
        self.connectivity = Connectivity::Offline;
        self.room_input.clear();
        self.room_link = None;
        self.current_room = None;
        self.messages.clear();
        self.input_text.clear();
    }

    fn enforce_cap(&mut self) {
        if self.messages.len() > MAX_MESSAGES {
            let excess = self.messages.len() - MAX_MESSAGES;
            self.messages.drain(..excess);
        }
    }
}
