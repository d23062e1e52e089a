use eframe::egui;

use crate::common::ChatMessage;

pub fn render(ui: &mut egui::Ui, messages: &[ChatMessage], local_user_id: &str) {
    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for message in messages {
                let own = message.sender_id == local_user_id;
                ui.horizontal_wrapped(|ui| {
                    if own {
                        ui.colored_label(egui::Color32::LIGHT_BLUE, "You:");
                    } else {
                        ui.colored_label(
                            egui::Color32::LIGHT_GREEN,
                            format!("{}:", message.sender_id),
                        );
                    }
                    ui.label(message.content.as_str());
                    ui.label(
                        egui::RichText::new(format_timestamp(message.created_at))
                            .weak()
                            .small(),
                    );
                });
            }
        });
}

fn format_timestamp(created_at: i64) -> String {
    match chrono::DateTime::from_timestamp(created_at, 0) {
        Some(when) => when.format("%H:%M:%S").to_string(),
        None => String::new(),
    }
}
