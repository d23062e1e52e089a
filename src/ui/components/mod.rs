pub mod auth_panel;
pub mod chat_area;
pub mod input_bar;
pub mod room_bar;
