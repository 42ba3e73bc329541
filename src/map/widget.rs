//! The surface the rest of the app sees of a map widget.
//!
//! A widget owns its markers, at most one popup and an optional circle overlay.
//! Anything the user does to it (and any change to its center or level, even one
//! made through this trait) is queued as a [`WidgetEvent`] and handed out by
//! [`MapWidget::drain_events`].

use std::sync::Arc;

use egui::Color32;

use super::geo::LatLng;
use super::icons::MarkerIcon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub icon: Arc<MarkerIcon>,
    pub title: String,
}

/// Something a popup button asks the app to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupAction {
    AddBookmark {
        name: String,
        address: Option<String>,
        position: LatLng,
    },
    RemoveBookmark {
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupButton {
    pub label: String,
    pub action: PopupAction,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopupContent {
    pub title: String,
    /// External detail page opened by clicking the title.
    pub link: Option<String>,
    pub lines: Vec<String>,
    pub button: Option<PopupButton>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopupAnchor {
    Marker(MarkerHandle),
    Position(LatLng),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleOverlay {
    pub center: LatLng,
    pub radius_m: f64,
    pub color: Color32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    CenterChanged(LatLng),
    /// New native level.
    LevelChanged(i32),
    Click(LatLng),
    RightClick(LatLng),
    MarkerClicked(MarkerHandle),
    PopupAction(PopupAction),
    PopupClosed,
}

pub trait MapWidget {
    /// Draw into the remaining space of `ui`; input becomes [`WidgetEvent`]s.
    fn show(&mut self, ui: &mut egui::Ui) -> egui::Response;

    fn center(&self) -> LatLng;
    fn set_center(&mut self, center: LatLng);

    /// Native level, in the provider's own units.
    fn level(&self) -> i32;
    fn set_level(&mut self, level: i32);

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle;
    /// Returns `false` if the handle was already gone.
    fn remove_marker(&mut self, handle: MarkerHandle) -> bool;
    fn marker_count(&self) -> usize;

    /// Replaces whatever popup is open.
    fn open_popup(&mut self, anchor: PopupAnchor, content: PopupContent);
    fn close_popup(&mut self);
    fn popup_anchor(&self) -> Option<PopupAnchor>;

    fn set_circle(&mut self, circle: Option<CircleOverlay>);

    fn drain_events(&mut self) -> Vec<WidgetEvent>;

    /// Release everything the widget holds. Calls after this are no-ops.
    fn destroy(&mut self);
}
