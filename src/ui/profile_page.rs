use egui::Ui;

use crate::i18n::{tr, Locale};
use crate::map::level::MapProvider;
use crate::profile::{Profile, ProfileUpdate, Theme};

use super::auth_pages::FormMessage;

/// The profile form. `draft` is what the user is editing; the saved row stays
/// in `profile` until the backend confirms the update.
#[derive(Default)]
pub struct ProfilePage {
    profile: Option<Profile>,
    draft: Option<ProfileUpdate>,
    pub loading: bool,
    pub saving: bool,
    pub message: Option<FormMessage>,
}

impl ProfilePage {
    pub fn needs_load(&self) -> bool {
        self.profile.is_none() && !self.loading && self.message.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn loaded(&mut self, profile: Option<Profile>, locale: Locale) {
        self.loading = false;
        match profile {
            Some(profile) => {
                self.draft = Some(ProfileUpdate::from_profile(&profile));
                self.profile = Some(profile);
            }
            None => self.message = Some(FormMessage::Error(tr(locale, "profile.notFound").to_string())),
        }
    }

    pub fn saved(&mut self, update: ProfileUpdate, locale: Locale) {
        self.saving = false;
        if let Some(profile) = self.profile.as_mut() {
            profile.nickname = Some(update.nickname.clone()).filter(|n| !n.is_empty());
            profile.preferred_map = update.preferred_map;
            profile.theme = update.theme;
            profile.language = update.language;
        }
        self.message = Some(FormMessage::Info(tr(locale, "profile.saveSuccess").to_string()));
    }

    pub fn failed(&mut self, message: String) {
        self.loading = false;
        self.saving = false;
        self.message = Some(FormMessage::Error(message));
    }

    /// Returns the update to send when the user presses save.
    pub fn show(&mut self, ui: &mut Ui, locale: Locale, providers: &[MapProvider]) -> Option<ProfileUpdate> {
        let mut submit = None;
        ui.vertical_centered(|ui| {
            ui.add_space(32.0);
            ui.heading(tr(locale, "profile.title"));
            ui.add_space(12.0);
            if self.loading {
                ui.spinner();
            }
            let (Some(profile), Some(draft)) = (&self.profile, self.draft.as_mut()) else {
                show_message(ui, &self.message);
                return;
            };

            egui::Grid::new("profile_form").num_columns(2).spacing([16.0, 8.0]).show(ui, |ui| {
                ui.label(tr(locale, "profile.email"));
                ui.label(&profile.email);
                ui.end_row();

                ui.label(tr(locale, "profile.nickname"));
                ui.text_edit_singleline(&mut draft.nickname);
                ui.end_row();

                ui.label(tr(locale, "profile.theme"));
                ui.horizontal(|ui| {
                    for theme in Theme::ALL {
                        ui.radio_value(&mut draft.theme, theme, tr(locale, theme.label_key()));
                    }
                });
                ui.end_row();

                ui.label(tr(locale, "profile.language"));
                ui.horizontal(|ui| {
                    ui.radio_value(&mut draft.language, Locale::Ko, tr(locale, "profile.korean"));
                    ui.radio_value(&mut draft.language, Locale::En, tr(locale, "profile.english"));
                });
                ui.end_row();

                ui.label(tr(locale, "profile.preferredMap"));
                ui.horizontal(|ui| {
                    for &provider in providers {
                        ui.radio_value(&mut draft.preferred_map, provider, provider.to_string());
                    }
                });
                ui.end_row();
            });

            ui.add_space(12.0);
            let save = ui.add_enabled(!self.saving, egui::Button::new(tr(locale, "common.save")));
            if save.clicked() {
                submit = Some(draft.clone());
            }
            show_message(ui, &self.message);
        });
        if submit.is_some() {
            self.saving = true;
            self.message = None;
        }
        submit
    }
}

fn show_message(ui: &mut Ui, message: &Option<FormMessage>) {
    match message {
        Some(FormMessage::Error(text)) => {
            ui.colored_label(ui.visuals().error_fg_color, text);
        }
        Some(FormMessage::Info(text)) => {
            ui.label(text);
        }
        None => {}
    }
}
