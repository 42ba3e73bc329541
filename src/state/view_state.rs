use crate::map::geo::LatLng;
use crate::map::level::{ZOOM_MAX, ZOOM_MIN};

use super::category::Category;

pub const RADIUS_MIN: u32 = 100;
pub const RADIUS_MAX: u32 = 3000;
pub const RADIUS_STEP: u32 = 100;

/// Seoul City Hall.
pub const DEFAULT_CENTER: LatLng = LatLng::new(37.5665, 126.978);
pub const DEFAULT_ZOOM: i32 = 13;
pub const DEFAULT_RADIUS: u32 = 1000;

/// The shared map view state.
///
/// Controls and the map adapter both read and write this record; the marker
/// managers compare what they last rendered against it every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    center: LatLng,
    selected_location: Option<LatLng>,
    zoom: i32,
    radius: u32,
    active_categories: Vec<Category>,
    search_version: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            selected_location: None,
            zoom: DEFAULT_ZOOM,
            radius: DEFAULT_RADIUS,
            active_categories: Vec::new(),
            search_version: 0,
        }
    }
}

impl ViewState {
    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn selected_location(&self) -> Option<LatLng> {
        self.selected_location
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn active_categories(&self) -> &[Category] {
        &self.active_categories
    }

    pub fn is_active(&self, category: Category) -> bool {
        self.active_categories.contains(&category)
    }

    pub fn search_version(&self) -> u64 {
        self.search_version
    }

    pub fn set_center(&mut self, center: LatLng) {
        self.center = center;
    }

    pub fn set_selected_location(&mut self, location: LatLng) {
        self.selected_location = Some(location);
    }

    pub fn set_zoom(&mut self, zoom: i32) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Always advances the search version, even when the value is unchanged
    /// (a slider released where it started still refreshes the markers).
    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius.clamp(RADIUS_MIN, RADIUS_MAX);
        self.search_version += 1;
    }

    pub fn toggle_category(&mut self, category: Category) {
        if let Some(index) = self.active_categories.iter().position(|c| *c == category) {
            self.active_categories.remove(index);
        } else {
            self.active_categories.push(category);
        }
    }

    pub fn trigger_search(&mut self) {
        self.search_version += 1;
    }

    /// Make `location` the search origin, center on it and refresh the markers.
    pub fn select_and_search(&mut self, location: LatLng) {
        self.set_selected_location(location);
        self.set_center(location);
        self.trigger_search();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_seoul_city_hall() {
        let state = ViewState::default();
        assert_eq!(state.center(), DEFAULT_CENTER);
        assert_eq!(state.zoom(), 13);
        assert_eq!(state.radius(), 1000);
        assert!(state.selected_location().is_none());
        assert!(state.active_categories().is_empty());
        assert_eq!(state.search_version(), 0);
    }

    #[test]
    fn toggling_twice_restores_the_set() {
        let mut state = ViewState::default();
        state.toggle_category(Category::Cafe);
        state.toggle_category(Category::Restaurant);
        let before = state.active_categories().to_vec();

        state.toggle_category(Category::Hospital);
        state.toggle_category(Category::Hospital);
        assert_eq!(state.active_categories(), before.as_slice());

        state.toggle_category(Category::Cafe);
        assert!(!state.is_active(Category::Cafe));
        state.toggle_category(Category::Cafe);
        assert!(state.is_active(Category::Cafe));
        assert!(state.is_active(Category::Restaurant));
        assert_eq!(state.active_categories().len(), 2);
    }

    #[test]
    fn radius_always_bumps_the_version() {
        let mut state = ViewState::default();
        state.set_radius(1000);
        assert_eq!(state.search_version(), 1);
        state.set_radius(1000);
        assert_eq!(state.search_version(), 2);
        state.set_radius(2500);
        assert_eq!(state.search_version(), 3);
    }

    #[test]
    fn radius_and_zoom_are_clamped() {
        let mut state = ViewState::default();
        state.set_radius(10);
        assert_eq!(state.radius(), RADIUS_MIN);
        state.set_radius(99_999);
        assert_eq!(state.radius(), RADIUS_MAX);
        state.set_zoom(0);
        assert_eq!(state.zoom(), ZOOM_MIN);
        state.set_zoom(50);
        assert_eq!(state.zoom(), ZOOM_MAX);
    }

    #[test]
    fn toggling_does_not_touch_the_version() {
        let mut state = ViewState::default();
        state.toggle_category(Category::Restaurant);
        assert_eq!(state.search_version(), 0);
    }

    #[test]
    fn select_and_search_moves_origin_and_center() {
        let mut state = ViewState::default();
        let gangnam = LatLng::new(37.4979, 127.0276);
        state.select_and_search(gangnam);
        assert_eq!(state.selected_location(), Some(gangnam));
        assert_eq!(state.center(), gangnam);
        assert_eq!(state.search_version(), 1);
    }
}
