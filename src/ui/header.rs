use egui::{RichText, Ui};

use crate::i18n::{tr, Locale};
use crate::profile::Theme;
use crate::routing::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    Navigate(Route),
    ToggleLocale,
    ToggleTheme,
    SignOut,
}

/// Light and dark swap; `System` goes to dark first.
pub fn next_theme(theme: Theme) -> Theme {
    match theme {
        Theme::Dark => Theme::Light,
        Theme::Light | Theme::System => Theme::Dark,
    }
}

pub fn show(ui: &mut Ui, locale: Locale, theme: Theme, route: Route, signed_in: bool) -> Option<HeaderAction> {
    let mut action = None;
    ui.horizontal(|ui| {
        ui.label(RichText::new(tr(locale, "common.appName")).heading().strong());
        ui.add_space(16.0);
        if signed_in {
            for (target, key) in [(Route::Map, "nav.map"), (Route::Profile, "nav.profile")] {
                if ui.selectable_label(route == target, tr(locale, key)).clicked() {
                    action = Some(HeaderAction::Navigate(target));
                }
            }
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if signed_in && ui.button(tr(locale, "common.logout")).clicked() {
                action = Some(HeaderAction::SignOut);
            }
            let icon = match theme {
                Theme::Dark => "☀",
                Theme::Light | Theme::System => "🌙",
            };
            if ui.button(icon).on_hover_text(tr(locale, "profile.theme")).clicked() {
                action = Some(HeaderAction::ToggleTheme);
            }
            let other = match locale {
                Locale::Ko => "EN",
                Locale::En => "한국어",
            };
            if ui.button(other).on_hover_text(tr(locale, "profile.language")).clicked() {
                action = Some(HeaderAction::ToggleLocale);
            }
        });
    });
    action
}
