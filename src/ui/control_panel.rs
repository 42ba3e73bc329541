use egui::{RichText, Sense, Ui};

use crate::bookmarks::Bookmark;
use crate::i18n::{category_label, tr, Locale};
use crate::map::geo::LatLng;
use crate::map::level::MapProvider;
use crate::state::view_state::{RADIUS_MAX, RADIUS_MIN, RADIUS_STEP};
use crate::state::{Category, ViewState};

#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    LocateMe,
    SwitchProvider(MapProvider),
    FocusBookmark(LatLng),
    RemoveBookmark(String),
}

/// `1000` → `1.0km`, `500` → `500m`.
pub fn format_radius(meters: u32) -> String {
    if meters >= 1000 {
        format!("{:.1}km", meters as f64 / 1000.0)
    } else {
        format!("{meters}m")
    }
}

pub fn naver_map_link(center: LatLng, zoom: i32) -> String {
    format!(
        "https://map.naver.com/v5/?c={},{},{},0,0,0,dh",
        center.lng, center.lat, zoom
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RadiusEdit {
    Idle,
    Dragging,
    Commit,
}

/// A drag only commits on release; keyboard and click edits commit at once.
fn radius_edit(changed: bool, dragging: bool, released: bool) -> RadiusEdit {
    if released || (changed && !dragging) {
        RadiusEdit::Commit
    } else if dragging {
        RadiusEdit::Dragging
    } else {
        RadiusEdit::Idle
    }
}

/// The value being dragged lives in egui's temp memory until release.
fn radius_slider(ui: &mut Ui, locale: Locale, state: &mut ViewState) {
    let draft_id = ui.id().with("radius_draft");
    let mut radius = ui.data(|d| d.get_temp::<u32>(draft_id)).unwrap_or(state.radius());
    ui.label(format!("{} {}", tr(locale, "map.radius"), format_radius(radius)));
    let slider = ui.add(
        egui::Slider::new(&mut radius, RADIUS_MIN..=RADIUS_MAX)
            .step_by(RADIUS_STEP as f64)
            .show_value(false),
    );
    match radius_edit(slider.changed(), slider.dragged(), slider.drag_stopped()) {
        RadiusEdit::Dragging => ui.data_mut(|d| d.insert_temp(draft_id, radius)),
        RadiusEdit::Commit => {
            ui.data_mut(|d| d.remove::<u32>(draft_id));
            state.set_radius(radius);
        }
        RadiusEdit::Idle => ui.data_mut(|d| d.remove::<u32>(draft_id)),
    }
}

pub struct PanelContext<'a> {
    pub locale: Locale,
    pub provider: MapProvider,
    pub providers: &'a [MapProvider],
    pub bookmarks: &'a [Bookmark],
    pub signed_in: bool,
    pub locating: bool,
}

pub fn show(ui: &mut Ui, state: &mut ViewState, cx: &PanelContext<'_>) -> Vec<PanelAction> {
    let locale = cx.locale;
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        let locate = ui.add_enabled(!cx.locating, egui::Button::new(tr(locale, "map.currentLocation")));
        if locate.clicked() {
            actions.push(PanelAction::LocateMe);
        }
        if cx.locating {
            ui.spinner();
        }
    });

    ui.separator();
    radius_slider(ui, locale, state);

    ui.separator();
    ui.label(tr(locale, "map.layers"));
    egui::Grid::new("category_toggles").num_columns(2).show(ui, |ui| {
        for (i, category) in Category::ALL.into_iter().enumerate() {
            if category_toggle(ui, locale, state.is_active(category), category).clicked() {
                state.toggle_category(category);
            }
            if i % 2 == 1 {
                ui.end_row();
            }
        }
    });

    if cx.providers.len() > 1 {
        ui.separator();
        ui.horizontal(|ui| {
            ui.label(tr(locale, "map.mapType"));
            for &provider in cx.providers {
                let label = match provider {
                    MapProvider::Kakao => "Kakao",
                    MapProvider::Naver => "Naver",
                };
                if ui.selectable_label(cx.provider == provider, label).clicked() && cx.provider != provider {
                    actions.push(PanelAction::SwitchProvider(provider));
                }
            }
        });
    }

    ui.hyperlink_to(tr(locale, "map.openInNaver"), naver_map_link(state.center(), state.zoom()));

    if cx.signed_in {
        ui.separator();
        ui.label(format!("{} ({})", tr(locale, "map.bookmarks"), cx.bookmarks.len()));
        egui::ScrollArea::vertical().max_height(180.0).show(ui, |ui| {
            for bookmark in cx.bookmarks {
                ui.horizontal(|ui| {
                    if ui.small_button("✕").on_hover_text(tr(locale, "map.removeBookmark")).clicked() {
                        actions.push(PanelAction::RemoveBookmark(bookmark.id.clone()));
                    }
                    let name = ui.link(RichText::new(&bookmark.name).strong());
                    if name.clicked() {
                        actions.push(PanelAction::FocusBookmark(bookmark.position()));
                    }
                });
                if let Some(address) = &bookmark.address {
                    ui.label(RichText::new(address).small().weak());
                }
            }
        });
    }

    actions
}

fn category_toggle(ui: &mut Ui, locale: Locale, active: bool, category: Category) -> egui::Response {
    ui.horizontal(|ui| {
        let (dot, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), Sense::hover());
        ui.painter().circle_filled(dot.center(), 5.0, category.color());
        ui.selectable_label(active, category_label(locale, category))
    })
    .inner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_formatting() {
        assert_eq!(format_radius(1000), "1.0km");
        assert_eq!(format_radius(2500), "2.5km");
        assert_eq!(format_radius(500), "500m");
        assert_eq!(format_radius(100), "100m");
    }

    #[test]
    fn dragging_the_radius_commits_once_on_release() {
        let steps = [(true, true, false); 28];
        assert!(steps
            .iter()
            .all(|&(changed, dragging, released)| radius_edit(changed, dragging, released) == RadiusEdit::Dragging));
        assert_eq!(radius_edit(false, false, true), RadiusEdit::Commit);
        assert_eq!(radius_edit(false, true, false), RadiusEdit::Dragging);
        assert_eq!(radius_edit(false, false, false), RadiusEdit::Idle);
    }

    #[test]
    fn keyboard_steps_commit_immediately() {
        assert_eq!(radius_edit(true, false, false), RadiusEdit::Commit);
    }

    #[test]
    fn naver_link_is_lng_first() {
        assert_eq!(
            naver_map_link(LatLng::new(37.5665, 126.978), 13),
            "https://map.naver.com/v5/?c=126.978,37.5665,13,0,0,0,dh"
        );
    }
}
