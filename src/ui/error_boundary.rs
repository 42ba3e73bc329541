//! Contains a panic raised while drawing one region of the window.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use egui::Ui;

use crate::i18n::{tr, Locale};

pub enum Boundary<R> {
    Rendered(R),
    Failed { retry: bool },
}

#[derive(Default)]
pub struct ErrorBoundary {
    failure: Option<String>,
}

impl ErrorBoundary {
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn reset(&mut self) {
        self.failure = None;
    }

    /// Run `content` unless an earlier call panicked. After a panic the region
    /// shows a message and a retry button instead, until [`reset`](Self::reset).
    pub fn show<R>(&mut self, ui: &mut Ui, locale: Locale, content: impl FnOnce(&mut Ui) -> R) -> Boundary<R> {
        if self.failure.is_none() {
            match run_guarded(|| content(ui)) {
                Ok(value) => return Boundary::Rendered(value),
                Err(message) => {
                    log::error!("map region panicked: {message}");
                    self.failure = Some(message);
                }
            }
        }
        let retry = ui
            .vertical_centered(|ui| {
                ui.add_space(ui.available_height() / 3.0);
                ui.heading(tr(locale, "map.renderFailed"));
                if let Some(message) = &self.failure {
                    ui.label(egui::RichText::new(message).small().weak());
                }
                ui.button(tr(locale, "map.retry")).clicked()
            })
            .inner;
        if retry {
            self.reset();
        }
        Boundary::Failed { retry }
    }
}

pub fn run_guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
