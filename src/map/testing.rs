//! In-memory widget and library used by the map layer's unit tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{AppError, Result};

use super::geo::LatLng;
use super::library::{MapLibrary, WidgetOptions};
use super::widget::{
    CircleOverlay, MapWidget, MarkerHandle, MarkerSpec, PopupAnchor, PopupContent, WidgetEvent,
};

#[derive(Default)]
pub struct WidgetLog {
    pub set_center_calls: usize,
    pub set_level_calls: usize,
    pub destroyed: bool,
}

#[derive(Default)]
pub struct RecordingWidget {
    center: LatLng,
    level: i32,
    next_handle: u64,
    pub markers: BTreeMap<MarkerHandle, MarkerSpec>,
    pub popup: Option<(PopupAnchor, PopupContent)>,
    pub circle: Option<CircleOverlay>,
    events: Vec<WidgetEvent>,
    pub log: Rc<RefCell<WidgetLog>>,
}

impl RecordingWidget {
    pub fn new(center: LatLng, level: i32) -> Self {
        Self {
            center,
            level,
            ..Default::default()
        }
    }

    /// Simulate the user dragging the map.
    pub fn user_pan(&mut self, center: LatLng) {
        self.center = center;
        self.events.push(WidgetEvent::CenterChanged(center));
    }

    pub fn user_zoom(&mut self, level: i32) {
        self.level = level;
        self.events.push(WidgetEvent::LevelChanged(level));
    }

    pub fn push_event(&mut self, event: WidgetEvent) {
        self.events.push(event);
    }

    pub fn handles(&self) -> Vec<MarkerHandle> {
        self.markers.keys().copied().collect()
    }
}

impl MapWidget for RecordingWidget {
    fn show(&mut self, ui: &mut egui::Ui) -> egui::Response {
        ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag())
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn set_center(&mut self, center: LatLng) {
        self.log.borrow_mut().set_center_calls += 1;
        if self.center != center {
            self.center = center;
            self.events.push(WidgetEvent::CenterChanged(center));
        }
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn set_level(&mut self, level: i32) {
        self.log.borrow_mut().set_level_calls += 1;
        if self.level != level {
            self.level = level;
            self.events.push(WidgetEvent::LevelChanged(level));
        }
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        self.markers.insert(handle, marker);
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> bool {
        if matches!(self.popup, Some((PopupAnchor::Marker(h), _)) if h == handle) {
            self.popup = None;
        }
        self.markers.remove(&handle).is_some()
    }

    fn marker_count(&self) -> usize {
        self.markers.len()
    }

    fn open_popup(&mut self, anchor: PopupAnchor, content: PopupContent) {
        self.popup = Some((anchor, content));
    }

    fn close_popup(&mut self) {
        self.popup = None;
    }

    fn popup_anchor(&self) -> Option<PopupAnchor> {
        self.popup.as_ref().map(|(anchor, _)| *anchor)
    }

    fn set_circle(&mut self, circle: Option<CircleOverlay>) {
        self.circle = circle;
    }

    fn drain_events(&mut self) -> Vec<WidgetEvent> {
        std::mem::take(&mut self.events)
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().destroyed = true;
        self.markers.clear();
        self.popup = None;
        self.circle = None;
    }
}

/// Library that becomes available after a number of availability checks.
pub struct FakeLibrary {
    pub checks_until_available: Option<u32>,
    pub fail_load: bool,
    pub fail_create: bool,
    pub load_calls: Rc<RefCell<u32>>,
    pub log: Rc<RefCell<WidgetLog>>,
}

impl FakeLibrary {
    pub fn available_after(checks: u32) -> Self {
        Self {
            checks_until_available: Some(checks),
            fail_load: false,
            fail_create: false,
            load_calls: Rc::default(),
            log: Rc::default(),
        }
    }

    pub fn never_available() -> Self {
        Self {
            checks_until_available: None,
            ..Self::available_after(0)
        }
    }
}

impl MapLibrary for FakeLibrary {
    type Widget = RecordingWidget;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&mut self) -> bool {
        match &mut self.checks_until_available {
            Some(0) => true,
            Some(n) => {
                *n -= 1;
                *n == 0
            }
            None => false,
        }
    }

    fn load(&mut self) -> Result<()> {
        *self.load_calls.borrow_mut() += 1;
        if self.fail_load {
            return Err(AppError::MapInit("handshake refused".to_string()));
        }
        Ok(())
    }

    fn create(&mut self, options: WidgetOptions) -> Result<RecordingWidget> {
        if self.fail_create {
            return Err(AppError::MapInit("no container".to_string()));
        }
        let mut widget = RecordingWidget::new(options.center, options.level);
        widget.log = self.log.clone();
        Ok(widget)
    }
}
