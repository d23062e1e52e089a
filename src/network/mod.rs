pub mod client;
pub mod protocol;
pub mod reconnect;

pub use client::BackendClient;
pub use reconnect::ReconnectPolicy;
