use clap::Parser;
use dotenvy::dotenv;
use tokio::sync::mpsc;

use rust_room_chat::api::ApiClient;
use rust_room_chat::config;
use rust_room_chat::network::BackendClient;
use rust_room_chat::storage::{self, SessionStore};
use rust_room_chat::ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "rust_room_chat",
    version,
    about = "Desktop chat client for private room servers"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Server base URL (overrides config file and CHAT_SERVER_URL)
    #[arg(long, value_name = "URL")]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    dotenv().ok();
    // Khởi tạo Logger để debug
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config);
    let server_url = config::resolve_server_url(cli.server, &app_config);

    // Ensure data directory exists
    storage::ensure_data_dir().ok();

    // Phiên đã lưu (nếu có) quyết định view khởi động: auth hay chat.
    let restored_user = match SessionStore::new() {
        Ok(store) => match store.load_session() {
            Ok(session) => session.map(|session| session.user),
            Err(err) => {
                log::warn!("Failed to load persisted session: {err}");
                None
            }
        },
        Err(err) => {
            log::warn!("Failed to open session store: {err}");
            None
        }
    };

    // 1. Tạo các kênh giao tiếp (Channels)
    // UI -> Backend
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Backend -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    // 2. Khởi chạy Backend Worker (Chạy ngầm)
    let backend_url = server_url.clone();
    tokio::spawn(async move {
        let api = ApiClient::new(backend_url);
        let sessions = match SessionStore::new() {
            Ok(store) => store,
            Err(err) => {
                log::error!("Cannot open session store: {err}");
                return;
            }
        };
        let client = BackendClient::new(event_tx, cmd_rx, api, sessions);
        if let Err(err) = client.run().await {
            log::error!("Backend worker terminated: {err}");
        }
    });

    // 3. Khởi chạy UI (Chạy trên Main Thread)
    let options = eframe::NativeOptions::default();
    let mut event_rx = Some(event_rx);
    let mut restored_user = restored_user;
    let mut prefs = SessionStore::new()
        .map_err(|err| log::warn!("Theme preference store unavailable: {err}"))
        .ok();

    eframe::run_native(
        "Rust Room Chat",
        options,
        Box::new(move |cc| {
            let event_receiver = event_rx
                .take()
                .expect("ChatApp should only be initialized once");

            log::info!("Client started against {server_url}");

            Ok(Box::new(ChatApp::new(
                cc,
                cmd_tx.clone(),
                event_receiver,
                restored_user.take(),
                prefs.take(),
            )))
        }),
    )
}
