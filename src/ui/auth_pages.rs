use egui::{RichText, Ui};

use crate::auth::{validate_credentials, validate_sign_up, OAuthProvider};
use crate::i18n::{tr, Locale};
use crate::routing::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    SignIn {
        email: String,
        password: String,
    },
    SignUp {
        email: String,
        password: String,
        nickname: Option<String>,
    },
    OAuth(OAuthProvider),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPageAction {
    Submit(AuthRequest),
    Navigate(Route),
}

/// Inline status under a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMessage {
    Error(String),
    Info(String),
}

fn message_label(ui: &mut Ui, message: &Option<FormMessage>) {
    match message {
        Some(FormMessage::Error(text)) => {
            ui.colored_label(ui.visuals().error_fg_color, text);
        }
        Some(FormMessage::Info(text)) => {
            ui.label(RichText::new(text).strong());
        }
        None => {}
    }
}

fn oauth_buttons(ui: &mut Ui, locale: Locale, enabled: bool, actions: &mut Vec<AuthPageAction>) {
    for (provider, key) in [
        (OAuthProvider::Google, "auth.loginWithGoogle"),
        (OAuthProvider::Kakao, "auth.loginWithKakao"),
    ] {
        let button = egui::Button::new(tr(locale, key)).min_size(egui::vec2(280.0, 32.0));
        if ui.add_enabled(enabled, button).clicked() {
            actions.push(AuthPageAction::Submit(AuthRequest::OAuth(provider)));
        }
    }
}

#[derive(Default)]
pub struct LoginPage {
    email: String,
    password: String,
    pub busy: bool,
    pub message: Option<FormMessage>,
}

impl LoginPage {
    pub fn reset(&mut self) {
        self.password.clear();
        self.busy = false;
        self.message = None;
    }

    /// Check the form and build the request, or leave an inline error.
    pub fn submit(&mut self, locale: Locale) -> Option<AuthRequest> {
        if let Err(key) = validate_credentials(&self.email, &self.password) {
            self.message = Some(FormMessage::Error(tr(locale, key).to_string()));
            return None;
        }
        self.message = None;
        self.busy = true;
        Some(AuthRequest::SignIn {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }

    pub fn show(&mut self, ui: &mut Ui, locale: Locale, configured: bool) -> Vec<AuthPageAction> {
        let mut actions = Vec::new();
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.heading(tr(locale, "auth.login"));
            ui.add_space(16.0);
            if !configured {
                ui.colored_label(ui.visuals().warn_fg_color, tr(locale, "auth.notConfigured"));
            }

            ui.add(egui::TextEdit::singleline(&mut self.email).hint_text(tr(locale, "auth.email")));
            let password = ui.add(
                egui::TextEdit::singleline(&mut self.password)
                    .password(true)
                    .hint_text(tr(locale, "auth.password")),
            );
            let entered = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let enabled = configured && !self.busy;
            let button = egui::Button::new(tr(locale, "auth.loginWithEmail")).min_size(egui::vec2(280.0, 32.0));
            let clicked = ui.add_enabled(enabled, button).clicked();
            if clicked || (entered && enabled) {
                if let Some(request) = self.submit(locale) {
                    actions.push(AuthPageAction::Submit(request));
                }
            }
            if self.busy {
                ui.spinner();
            }
            message_label(ui, &self.message);

            ui.separator();
            oauth_buttons(ui, locale, enabled, &mut actions);

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                ui.label(tr(locale, "auth.noAccount"));
                if ui.link(tr(locale, "auth.signup")).clicked() {
                    actions.push(AuthPageAction::Navigate(Route::Signup));
                }
            });
        });
        actions
    }
}

#[derive(Default)]
pub struct SignupPage {
    email: String,
    password: String,
    confirm: String,
    nickname: String,
    pub busy: bool,
    pub message: Option<FormMessage>,
}

impl SignupPage {
    pub fn reset(&mut self) {
        self.password.clear();
        self.confirm.clear();
        self.busy = false;
        self.message = None;
    }

    pub fn submit(&mut self, locale: Locale) -> Option<AuthRequest> {
        if let Err(key) = validate_sign_up(&self.email, &self.password, &self.confirm) {
            self.message = Some(FormMessage::Error(tr(locale, key).to_string()));
            return None;
        }
        self.message = None;
        self.busy = true;
        let nickname = self.nickname.trim();
        Some(AuthRequest::SignUp {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            nickname: (!nickname.is_empty()).then(|| nickname.to_string()),
        })
    }

    pub fn show(&mut self, ui: &mut Ui, locale: Locale, configured: bool) -> Vec<AuthPageAction> {
        let mut actions = Vec::new();
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.heading(tr(locale, "auth.signup"));
            ui.add_space(16.0);
            if !configured {
                ui.colored_label(ui.visuals().warn_fg_color, tr(locale, "auth.notConfigured"));
            }

            ui.add(egui::TextEdit::singleline(&mut self.email).hint_text(tr(locale, "auth.email")));
            ui.add(egui::TextEdit::singleline(&mut self.nickname).hint_text(tr(locale, "auth.nickname")));
            ui.add(
                egui::TextEdit::singleline(&mut self.password)
                    .password(true)
                    .hint_text(tr(locale, "auth.password")),
            );
            ui.add(
                egui::TextEdit::singleline(&mut self.confirm)
                    .password(true)
                    .hint_text(tr(locale, "auth.confirmPassword")),
            );

            let enabled = configured && !self.busy;
            let button = egui::Button::new(tr(locale, "auth.signupWithEmail")).min_size(egui::vec2(280.0, 32.0));
            if ui.add_enabled(enabled, button).clicked() {
                if let Some(request) = self.submit(locale) {
                    actions.push(AuthPageAction::Submit(request));
                }
            }
            if self.busy {
                ui.spinner();
            }
            message_label(ui, &self.message);

            ui.separator();
            oauth_buttons(ui, locale, enabled, &mut actions);

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                ui.label(tr(locale, "auth.haveAccount"));
                if ui.link(tr(locale, "auth.login")).clicked() {
                    actions.push(AuthPageAction::Navigate(Route::Login));
                }
            });
        });
        actions
    }
}
