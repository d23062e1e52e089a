use eframe::egui;
use tokio::sync::mpsc;

use crate::common::types::User;
use crate::common::{NetworkCommand, NetworkEvent};
use crate::storage::SessionStore;
use crate::storage::session_store::PREF_THEME;

use super::components::auth_panel::{self, AuthPanelActions, AuthSubmit};
use super::components::room_bar::{self, RoomBarActions};
use super::components::{chat_area, input_bar};
use super::state::{AppState, Connectivity};

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<NetworkCommand>,
    event_receiver: mpsc::Receiver<NetworkEvent>,
    prefs: Option<SessionStore>,
    dark_mode: bool,
}

impl ChatApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<NetworkCommand>,
        event_receiver: mpsc::Receiver<NetworkEvent>,
        restored_user: Option<User>,
        prefs: Option<SessionStore>,
    ) -> Self {
        let dark_mode = prefs
            .as_ref()
            .and_then(|store| store.get_pref(PREF_THEME).ok().flatten())
            .map(|value| value == "dark")
            .unwrap_or(false);
        apply_theme(&cc.egui_ctx, dark_mode);

        let app = Self {
            state: AppState::new(restored_user),
            command_sender,
            event_receiver,
            prefs,
            dark_mode,
        };
        if app.state.user.is_some() {
            // Restore phiên cũ: mở lại realtime session ngay khi khởi động.
            app.send_command(NetworkCommand::Connect);
        }
        app
    }

    fn send_command(&self, command: NetworkCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to backend: {err}");
        }
    }

    fn handle_network_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                NetworkEvent::AuthSucceeded(user) => {
                    self.state.auth.busy = false;
                    self.state.auth.error = None;
                    self.state.auth.password.clear();
                    self.state.user = Some(user);
                }
                NetworkEvent::AuthFailed(error) => {
                    self.state.auth.busy = false;
                    self.state.auth.error = Some(error);
                }
                NetworkEvent::RoomCreated(handle) => {
                    self.state.room_input = handle.room_id;
                    self.state.room_link = Some(handle.link);
                }
                NetworkEvent::Connected => {
                    self.state.connectivity = Connectivity::Online;
                }
                NetworkEvent::Disconnected { reason } => {
                    log::info!("Realtime connection down: {reason}");
                    self.state.connectivity = Connectivity::Offline;
                }
                NetworkEvent::Reconnecting { attempt, .. } => {
                    self.state.connectivity = Connectivity::Reconnecting { attempt };
                }
                NetworkEvent::HistoryLoaded { room_id, messages } => {
                    self.state.replace_history(&room_id, messages);
                }
                NetworkEvent::MessageReceived(message) => self.state.apply_message(message),
                NetworkEvent::LoggedOut => self.state.reset_after_logout(),
            }
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.dark_mode = !self.dark_mode;
        apply_theme(ctx, self.dark_mode);
        if let Some(prefs) = &self.prefs {
            let value = if self.dark_mode { "dark" } else { "light" };
            if let Err(err) = prefs.set_pref(PREF_THEME, value) {
                log::warn!("Failed to persist theme preference: {err}");
            }
        }
    }

    fn render_auth(&mut self, ctx: &egui::Context) {
        let mut actions = AuthPanelActions::default();
        egui::CentralPanel::default().show(ctx, |ui| {
            actions = auth_panel::render(ui, &mut self.state.auth, self.dark_mode);
        });

        if actions.toggle_theme {
            self.toggle_theme(ctx);
        }
        if let Some(submit) = actions.submit {
            self.state.auth.busy = true;
            match submit {
                AuthSubmit::Login { email, password } => {
                    self.send_command(NetworkCommand::Login { email, password });
                }
                AuthSubmit::Register {
                    name,
                    email,
                    password,
                } => {
                    self.send_command(NetworkCommand::Register {
                        name,
                        email,
                        password,
                    });
                }
            }
        }
    }

    fn render_chat(&mut self, ctx: &egui::Context) {
        let mut actions = RoomBarActions::default();
        egui::TopBottomPanel::top("room_bar").show(ctx, |ui| {
            actions = room_bar::render(ui, &mut self.state, self.dark_mode);
        });

        if actions.toggle_theme {
            self.toggle_theme(ctx);
        }
        if actions.create_room {
            self.send_command(NetworkCommand::CreateRoom);
        }
        if let Some(room_id) = actions.join_room {
            self.state.begin_join(room_id.clone());
            self.send_command(NetworkCommand::JoinRoom { room_id });
        }
        if actions.logout {
            self.send_command(NetworkCommand::Logout);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(link) = self.state.room_link.clone() {
                ui.horizontal(|ui| {
                    ui.label("Share this link:");
                    ui.hyperlink(link);
                });
                ui.separator();
            }

            let local_user_id = self
                .state
                .user
                .as_ref()
                .map(|user| user.id.clone())
                .unwrap_or_default();
            chat_area::render(ui, &self.state.messages, &local_user_id);

            ui.separator();
            if self.state.joined() {
                if let Some(content) = input_bar::render(ui, &mut self.state.input_text) {
                    if let Some(room_id) = self.state.current_room.clone() {
                        self.send_command(NetworkCommand::SendMessage { room_id, content });
                    }
                }
            } else {
                ui.label("Create or join a room to start chatting.");
            }
        });
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_network_events();

        if self.state.user.is_some() {
            self.render_chat(ctx);
        } else {
            self.render_auth(ctx);
        }

        ctx.request_repaint();
    }
}

fn apply_theme(ctx: &egui::Context, dark_mode: bool) {
    if dark_mode {
        ctx.set_visuals(egui::Visuals::dark());
    } else {
        ctx.set_visuals(egui::Visuals::light());
    }
}
