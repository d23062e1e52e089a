use crate::common::types::User;

/// Phiên đăng nhập lưu trên đĩa, sống qua các lần khởi động lại app.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
    pub created_at: i64,
}
