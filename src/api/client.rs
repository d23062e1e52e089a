use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::common::types::{ChatMessage, RoomHandle, User};

/// Lỗi khi gọi REST API của room server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Thông báo lỗi server trả về trong body (`{"error": "..."}`).
    #[error("{0}")]
    Server(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client gắn bearer token vào mọi request sau khi đăng nhập.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Realtime endpoint suy ra từ base URL (http -> ws, https -> wss).
    pub fn websocket_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.base_url)
        };
        format!("{ws_base}/ws")
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = self
            .http
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": password }));
        into_result(self.authorize(request).send().await?).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let request = self
            .http
            .post(self.url("/api/register"))
            .json(&json!({ "name": name, "email": email, "password": password }));
        into_result(self.authorize(request).send().await?).await
    }

    pub async fn create_room(&self) -> Result<RoomHandle, ApiError> {
        let request = self.http.post(self.url("/api/create-room"));
        into_result(self.authorize(request).send().await?).await
    }

    pub async fn room_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let request = self
            .http
            .get(self.url(&format!("/api/rooms/{room_id}/messages")));
        into_result(self.authorize(request).send().await?).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn into_result<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => format!("request failed with status {status}"),
    };
    Err(ApiError::Server(message))
}
