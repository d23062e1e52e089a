use eframe::egui;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ui::state::AuthForm;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Submit hợp lệ từ form auth.
#[derive(Debug, Clone)]
pub enum AuthSubmit {
    Login {
        email: String,
        password: String,
    },
    Register {
        name: String,
        email: String,
        password: String,
    },
}

#[derive(Default)]
pub struct AuthPanelActions {
    pub submit: Option<AuthSubmit>,
    pub toggle_theme: bool,
}

pub fn render(ui: &mut egui::Ui, form: &mut AuthForm, dark_mode: bool) -> AuthPanelActions {
    let mut actions = AuthPanelActions::default();

    ui.vertical_centered(|ui| {
        ui.set_max_width(360.0);
        ui.add_space(48.0);

        ui.horizontal(|ui| {
            ui.heading(if form.is_register { "Register" } else { "Login" });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = if dark_mode { "Light mode" } else { "Dark mode" };
                if ui.button(label).clicked() {
                    actions.toggle_theme = true;
                }
            });
        });
        ui.add_space(8.0);

        if form.is_register {
            ui.add(egui::TextEdit::singleline(&mut form.name).hint_text("Your name"));
        }
        ui.add(egui::TextEdit::singleline(&mut form.email).hint_text("Email"));
        ui.add(
            egui::TextEdit::singleline(&mut form.password)
                .password(true)
                .hint_text("Password"),
        );

        if let Some(error) = &form.error {
            ui.colored_label(egui::Color32::LIGHT_RED, error.clone());
        }

        ui.add_space(8.0);
        let submit_label = if form.busy {
            "Working..."
        } else if form.is_register {
            "Create account"
        } else {
            "Login"
        };
        let clicked = ui
            .add_enabled(!form.busy, egui::Button::new(submit_label))
            .clicked();
        let enter = !form.busy && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if clicked || enter {
            actions.submit = validate(form);
        }

        ui.add_space(4.0);
        let switch_label = if form.is_register {
            "Have an account? Login"
        } else {
            "Don't have an account? Register"
        };
        if ui.link(switch_label).clicked() {
            form.is_register = !form.is_register;
            form.error = None;
        }
    });

    actions
}

/// Kiểm tra form trước khi gửi; lỗi hiển thị inline y như lỗi từ server.
fn validate(form: &mut AuthForm) -> Option<AuthSubmit> {
    let email = form.email.trim().to_string();
    if !is_valid_email(&email) {
        form.error = Some("Please enter a valid email address".to_string());
        return None;
    }
    if form.password.is_empty() {
        form.error = Some("Password must not be empty".to_string());
        return None;
    }
    if form.is_register && form.name.trim().is_empty() {
        form.error = Some("Please enter your name".to_string());
        return None;
    }

    form.error = None;
    Some(if form.is_register {
        AuthSubmit::Register {
            name: form.name.trim().to_string(),
            email,
            password: form.password.clone(),
        }
    } else {
        AuthSubmit::Login {
            email,
            password: form.password.clone(),
        }
    })
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}
