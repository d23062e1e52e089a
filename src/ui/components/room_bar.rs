use eframe::egui;

use crate::ui::state::{AppState, Connectivity};

#[derive(Default)]
pub struct RoomBarActions {
    pub create_room: bool,
    pub join_room: Option<String>,
    pub logout: bool,
    pub toggle_theme: bool,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState, dark_mode: bool) -> RoomBarActions {
    let mut actions = RoomBarActions::default();

    ui.horizontal(|ui| {
        if ui.button("Create Private Room").clicked() {
            actions.create_room = true;
        }

        ui.add(
            egui::TextEdit::singleline(&mut state.room_input)
                .hint_text("Enter room ID to join")
                .desired_width(220.0),
        );

        let can_join = !state.room_input.trim().is_empty();
        if ui.add_enabled(can_join, egui::Button::new("Join Room")).clicked() {
            actions.join_room = Some(state.room_input.trim().to_string());
        }

        if ui.button("Logout").clicked() {
            actions.logout = true;
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let label = if dark_mode { "Light mode" } else { "Dark mode" };
            if ui.button(label).clicked() {
                actions.toggle_theme = true;
            }
            render_connectivity(ui, &state.connectivity);
        });
    });

    actions
}

fn render_connectivity(ui: &mut egui::Ui, connectivity: &Connectivity) {
    match connectivity {
        Connectivity::Online => {
            ui.colored_label(egui::Color32::GREEN, "●");
            ui.label(egui::RichText::new("connected").weak());
        }
        Connectivity::Offline => {
            ui.colored_label(egui::Color32::GRAY, "○");
            ui.label(egui::RichText::new("offline").weak());
        }
        Connectivity::Reconnecting { attempt } => {
            ui.colored_label(egui::Color32::YELLOW, "●");
            ui.label(egui::RichText::new(format!("reconnecting ({attempt})")).weak());
        }
    }
}
