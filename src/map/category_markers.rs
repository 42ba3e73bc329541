//! Markers for the places found around the search origin, one set per category.

use std::collections::HashMap;

use egui::Color32;

use crate::error::Result;
use crate::maps_api::local_search::{CategorySearch, PlaceResult, SearchStatus, SortBy};
use crate::state::{Category, ViewState};

use super::geo::LatLng;
use super::icons::IconCache;
use super::widget::{
    CircleOverlay, MapWidget, MarkerHandle, MarkerSpec, PopupAction, PopupAnchor, PopupButton,
    PopupContent,
};

const RADIUS_COLOR: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);

/// Everything the rendered marker set depends on. Any difference, including
/// only the search version, means a full rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryQuery {
    pub categories: Vec<Category>,
    pub origin: Option<LatLng>,
    pub radius: u32,
    pub version: u64,
}

impl CategoryQuery {
    pub fn from_state(state: &ViewState) -> Self {
        Self {
            categories: state.active_categories().to_vec(),
            origin: state.selected_location(),
            radius: state.radius(),
            version: state.search_version(),
        }
    }
}

/// Identifies one round of searches. Responses carrying an older token are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchToken {
    pub version: u64,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedSearch {
    pub token: SearchToken,
    pub request: CategorySearch,
}

#[derive(Debug)]
struct PlacedMarker {
    handle: MarkerHandle,
    place: PlaceResult,
}

#[derive(Default)]
pub struct CategoryMarkers {
    markers: HashMap<Category, Vec<PlacedMarker>>,
    icons: IconCache,
    rendered: Option<CategoryQuery>,
    latest: Option<SearchToken>,
    generation: u64,
    add_bookmark_label: Option<String>,
}

impl CategoryMarkers {
    /// Offer "add to bookmarks" in place popups, under `label`.
    pub fn wire_bookmark_actions(&mut self, label: impl Into<String>) {
        self.add_bookmark_label = Some(label.into());
    }

    pub fn unwire_bookmark_actions(&mut self) {
        self.add_bookmark_label = None;
    }

    /// Bring the widget in line with `query`. Returns the searches to issue,
    /// empty when nothing changed or there is nothing to search for.
    pub fn sync(&mut self, widget: &mut dyn MapWidget, query: &CategoryQuery) -> Vec<IssuedSearch> {
        if self.rendered.as_ref() == Some(query) {
            return Vec::new();
        }
        self.clear(widget);
        self.rendered = Some(query.clone());

        widget.set_circle(query.origin.map(|center| CircleOverlay {
            center,
            radius_m: query.radius as f64,
            color: RADIUS_COLOR,
        }));

        let Some(origin) = query.origin else {
            self.latest = None;
            return Vec::new();
        };
        if query.categories.is_empty() {
            self.latest = None;
            return Vec::new();
        }

        self.generation += 1;
        let token = SearchToken {
            version: query.version,
            generation: self.generation,
        };
        self.latest = Some(token);

        query
            .categories
            .iter()
            .map(|&category| {
                self.icons.for_category(category);
                IssuedSearch {
                    token,
                    request: CategorySearch {
                        category,
                        origin,
                        radius: query.radius,
                        sort: SortBy::Distance,
                    },
                }
            })
            .collect()
    }

    /// Render the answer to one issued search. Returns how many markers were placed.
    pub fn apply_results(
        &mut self,
        widget: &mut dyn MapWidget,
        token: SearchToken,
        category: Category,
        result: Result<SearchStatus>,
    ) -> usize {
        if self.latest != Some(token) {
            log::debug!("dropping stale {} results ({token:?})", category.code());
            return 0;
        }
        let still_active = self
            .rendered
            .as_ref()
            .is_some_and(|q| q.categories.contains(&category));
        if !still_active {
            return 0;
        }

        let places = match result {
            Ok(status) => status.into_places(),
            Err(e) => {
                log::warn!("{} search failed: {e}", category.code());
                return 0;
            }
        };

        if let Some(old) = self.markers.remove(&category) {
            for marker in old {
                widget.remove_marker(marker.handle);
            }
        }

        let icon = self.icons.for_category(category);
        let placed: Vec<PlacedMarker> = places
            .into_iter()
            .filter_map(|place| {
                let position = place.position()?;
                let handle = widget.add_marker(MarkerSpec {
                    position,
                    icon: icon.clone(),
                    title: place.place_name.clone(),
                });
                Some(PlacedMarker { handle, place })
            })
            .collect();
        let count = placed.len();
        self.markers.insert(category, placed);
        count
    }

    /// Open the popup for `handle` if it is one of ours.
    pub fn on_marker_clicked(&self, widget: &mut dyn MapWidget, handle: MarkerHandle) -> bool {
        let Some(place) = self.find(handle) else {
            return false;
        };
        widget.close_popup();
        widget.open_popup(
            PopupAnchor::Marker(handle),
            place_popup(place, self.add_bookmark_label.as_deref()),
        );
        true
    }

    fn find(&self, handle: MarkerHandle) -> Option<&PlaceResult> {
        self.markers
            .values()
            .flatten()
            .find(|m| m.handle == handle)
            .map(|m| &m.place)
    }

    pub fn owns(&self, handle: MarkerHandle) -> bool {
        self.find(handle).is_some()
    }

    pub fn marker_count(&self, category: Category) -> usize {
        self.markers.get(&category).map_or(0, Vec::len)
    }

    pub fn total_markers(&self) -> usize {
        self.markers.values().map(Vec::len).sum()
    }

    pub fn icons(&self) -> &IconCache {
        &self.icons
    }

    /// Remove every marker and close the popup.
    pub fn clear(&mut self, widget: &mut dyn MapWidget) {
        for marker in self.markers.drain().flat_map(|(_, markers)| markers) {
            widget.remove_marker(marker.handle);
        }
        widget.close_popup();
    }

    pub fn teardown(&mut self, widget: &mut dyn MapWidget) {
        self.clear(widget);
        widget.set_circle(None);
        self.unwire_bookmark_actions();
        self.rendered = None;
        self.latest = None;
    }
}

pub fn place_popup(place: &PlaceResult, add_bookmark_label: Option<&str>) -> PopupContent {
    let mut lines = vec![place.display_address().to_string()];
    if let Some(phone) = place.phone() {
        lines.push(phone.to_string());
    }
    let link = (!place.place_url.is_empty()).then(|| place.place_url.clone());
    let button = add_bookmark_label.zip(place.position()).map(|(label, position)| PopupButton {
        label: label.to_string(),
        action: PopupAction::AddBookmark {
            name: place.place_name.clone(),
            address: Some(place.display_address().to_string()).filter(|a| !a.is_empty()),
            position,
        },
    });
    PopupContent {
        title: place.place_name.clone(),
        link,
        lines,
        button,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::map::testing::RecordingWidget;

    fn place(id: usize, lat: f64, lng: f64) -> PlaceResult {
        PlaceResult {
            id: id.to_string(),
            place_name: format!("place {id}"),
            address_name: format!("{id} Sejong-daero"),
            x: lng.to_string(),
            y: lat.to_string(),
            place_url: format!("http://place.map.kakao.com/{id}"),
            ..Default::default()
        }
    }

    fn results(k: usize) -> Result<SearchStatus> {
        let places: Vec<_> = (0..k).map(|i| place(i, 37.5 + i as f64 * 0.001, 127.0)).collect();
        Ok(SearchStatus::Ok {
            places,
            meta: Default::default(),
        })
    }

    fn searching_state() -> ViewState {
        let mut state = ViewState::default();
        state.toggle_category(Category::Restaurant);
        state.set_selected_location(LatLng::new(37.5, 127.0));
        state
    }

    #[test]
    fn no_origin_means_no_search() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        let mut state = ViewState::default();
        state.toggle_category(Category::Restaurant);

        let issued = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        assert!(issued.is_empty());
        assert!(widget.circle.is_none());
    }

    #[test]
    fn one_search_per_active_category() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        let mut state = searching_state();
        state.toggle_category(Category::Cafe);

        let issued = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        assert_eq!(issued.len(), 2);
        assert!(issued.iter().all(|s| s.request.radius == 1000));
        assert!(issued.iter().all(|s| s.request.sort == SortBy::Distance));
        assert_eq!(issued[0].request.origin, LatLng::new(37.5, 127.0));
        assert_eq!(markers.icons().len(), 2);

        // Same inputs: nothing to do.
        assert!(markers
            .sync(&mut widget, &CategoryQuery::from_state(&state))
            .is_empty());
    }

    #[test]
    fn k_results_become_k_markers_and_toggle_off_clears_them() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        let mut state = searching_state();

        let issued = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        let token = issued[0].token;
        assert_eq!(markers.apply_results(&mut widget, token, Category::Restaurant, results(5)), 5);
        assert_eq!(markers.marker_count(Category::Restaurant), 5);
        assert_eq!(widget.marker_count(), 5);

        let clicked = widget.handles()[2];
        assert!(markers.on_marker_clicked(&mut widget, clicked));
        assert_eq!(widget.popup_anchor(), Some(PopupAnchor::Marker(clicked)));

        state.toggle_category(Category::Restaurant);
        let issued = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        assert!(issued.is_empty());
        assert_eq!(widget.marker_count(), 0);
        assert_eq!(markers.total_markers(), 0);
        assert!(widget.popup_anchor().is_none());
    }

    #[test]
    fn version_bump_alone_forces_a_refresh() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        let mut state = searching_state();

        let first = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        markers.apply_results(&mut widget, first[0].token, Category::Restaurant, results(3));

        state.trigger_search();
        let second = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].token, second[0].token);
        assert_eq!(widget.marker_count(), 0);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        let mut state = searching_state();

        let old = markers.sync(&mut widget, &CategoryQuery::from_state(&state))[0].token;
        state.set_radius(2000);
        let new = markers.sync(&mut widget, &CategoryQuery::from_state(&state))[0].token;

        assert_eq!(markers.apply_results(&mut widget, old, Category::Restaurant, results(4)), 0);
        assert_eq!(widget.marker_count(), 0);
        assert_eq!(markers.apply_results(&mut widget, new, Category::Restaurant, results(2)), 2);
        assert_eq!(widget.marker_count(), 2);
    }

    #[test]
    fn toggling_another_category_refreshes_with_a_new_generation() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        let mut state = searching_state();

        let before = markers.sync(&mut widget, &CategoryQuery::from_state(&state))[0].token;
        state.toggle_category(Category::Cafe);
        let after = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        assert_eq!(before.version, after[0].token.version);
        assert_ne!(before, after[0].token);
        assert_eq!(
            markers.apply_results(&mut widget, before, Category::Restaurant, results(3)),
            0
        );
    }

    #[test]
    fn failed_search_leaves_other_categories_alone() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        let mut state = searching_state();
        state.toggle_category(Category::Cafe);

        let issued = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        let token = issued[0].token;
        markers.apply_results(&mut widget, token, Category::Restaurant, results(2));
        let failed = Err(AppError::api("kakao", 500, "boom"));
        assert_eq!(markers.apply_results(&mut widget, token, Category::Cafe, failed), 0);
        assert_eq!(widget.marker_count(), 2);
    }

    #[test]
    fn popup_offers_bookmarking_only_when_wired() {
        let p = place(7, 37.5665, 126.978);
        assert!(place_popup(&p, None).button.is_none());

        let content = place_popup(&p, Some("Add to bookmarks"));
        assert_eq!(content.link.as_deref(), Some("http://place.map.kakao.com/7"));
        let Some(PopupButton {
            action: PopupAction::AddBookmark { name, position, .. },
            ..
        }) = content.button
        else {
            panic!("expected an add action");
        };
        assert_eq!(name, "place 7");
        assert_eq!(position, LatLng::new(37.5665, 126.978));
    }

    #[test]
    fn teardown_unwires_and_clears() {
        let mut widget = RecordingWidget::default();
        let mut markers = CategoryMarkers::default();
        markers.wire_bookmark_actions("Add");
        let state = searching_state();
        let issued = markers.sync(&mut widget, &CategoryQuery::from_state(&state));
        markers.apply_results(&mut widget, issued[0].token, Category::Restaurant, results(1));

        markers.teardown(&mut widget);
        assert_eq!(widget.marker_count(), 0);
        assert!(widget.circle.is_none());
        assert!(markers.add_bookmark_label.is_none());
    }
}
