/// Lệnh UI gửi xuống backend worker.
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    Login {
        email: String,
        password: String,
    },
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Mở realtime session bằng token đã lưu (dùng khi restore session lúc khởi động).
    Connect,
    CreateRoom,
    /// Join một room: leave room cũ nếu có, emit join event, fetch lịch sử qua HTTP.
    JoinRoom {
        room_id: String,
    },
    SendMessage {
        room_id: String,
        content: String,
    },
    Logout,
}
