//! The map screen: search box, control panel and the map itself.
//!
//! Each frame runs the same loop. Finished background work is applied first,
//! then the widget is drawn and its events flow into the view state, then the
//! controls edit the state, and finally the state is pushed back into the
//! widget and the marker managers.

use std::sync::Arc;
use std::time::Instant;

use egui::{Align2, Ui};
use tokio::runtime::Handle;

use crate::bookmarks::{BookmarkChange, Bookmarks};
use crate::config::Config;
use crate::error::Result;
use crate::i18n::{tr, Locale};
use crate::map::adapter::{AdapterEvent, AdapterStatus, MapAdapter};
use crate::map::bookmark_markers::BookmarkMarkers;
use crate::map::category_markers::{CategoryMarkers, CategoryQuery, IssuedSearch, SearchToken};
use crate::map::geo::LatLng;
use crate::map::level::MapProvider;
use crate::map::library::{MapLibrary, TileMapLibrary};
use crate::map::widget::{MapWidget, PopupAction, PopupAnchor, PopupButton, PopupContent};
use crate::maps_api::geolocation::IpGeolocator;
use crate::maps_api::local_search::{KakaoLocalClient, KeywordSearch, PlaceResult, PlaceSearch, SearchStatus};
use crate::maps_api::tile_retriever::TileRetriever;
use crate::state::{Category, ViewState};
use crate::tasks::Tasks;

use super::control_panel::{self, PanelAction, PanelContext};
use super::error_boundary::{Boundary, ErrorBoundary};
use super::search_box::{SearchBox, SearchBoxAction, MAX_SUGGESTIONS};

type CategoryAnswer = (SearchToken, Category, Result<SearchStatus>);

/// Builds a fresh map library for every adapter (first load, retry, provider switch).
pub type LibraryFactory<L> = Box<dyn Fn() -> Result<L>>;

pub struct MapPage<L: MapLibrary = TileMapLibrary> {
    state: ViewState,
    provider: MapProvider,
    providers: Vec<MapProvider>,
    new_library: LibraryFactory<L>,
    adapter: Option<MapAdapter<L>>,
    build_error: Option<String>,
    categories: CategoryMarkers,
    stars: BookmarkMarkers,
    search_box: SearchBox,
    place_search: Option<Arc<dyn PlaceSearch>>,
    geolocator: IpGeolocator,
    category_tasks: Tasks<CategoryAnswer>,
    keyword_tasks: Tasks<(u64, Result<SearchStatus>)>,
    locate_tasks: Tasks<Result<LatLng>>,
    boundary: ErrorBoundary,
    /// Locale and sign-in state the popup actions were last wired for.
    wiring: Option<(Locale, bool)>,
}

impl MapPage<TileMapLibrary> {
    pub fn new(config: &Config, preferred: MapProvider, handle: Handle, repaint: egui::Context) -> Self {
        let place_search = config
            .kakao_rest_key
            .as_ref()
            .map(|key| Arc::new(KakaoLocalClient::new(key.clone())) as Arc<dyn PlaceSearch>);
        let tile_url = config.tile_url.clone();
        let (tile_handle, tile_repaint) = (handle.clone(), repaint.clone());
        let new_library: LibraryFactory<TileMapLibrary> = Box::new(move || {
            let retriever = TileRetriever::new(tile_url.clone())?;
            Ok(TileMapLibrary::new(retriever, tile_handle.clone(), Some(tile_repaint.clone())))
        });
        Self::with_library(
            config.enabled_providers(),
            preferred,
            place_search,
            IpGeolocator::new(config.geolocation_url.clone()),
            handle,
            repaint,
            new_library,
        )
    }
}

impl<L: MapLibrary> MapPage<L> {
    pub fn with_library(
        providers: Vec<MapProvider>,
        preferred: MapProvider,
        place_search: Option<Arc<dyn PlaceSearch>>,
        geolocator: IpGeolocator,
        handle: Handle,
        repaint: egui::Context,
        new_library: LibraryFactory<L>,
    ) -> Self {
        let provider = if providers.contains(&preferred) {
            preferred
        } else {
            providers.first().copied().unwrap_or(preferred)
        };
        let mut page = Self {
            state: ViewState::default(),
            provider,
            new_library,
            adapter: None,
            build_error: None,
            categories: CategoryMarkers::default(),
            stars: BookmarkMarkers::default(),
            search_box: SearchBox::default(),
            place_search,
            geolocator,
            category_tasks: tasks(&handle, &repaint),
            keyword_tasks: tasks(&handle, &repaint),
            locate_tasks: tasks(&handle, &repaint),
            boundary: ErrorBoundary::default(),
            wiring: None,
            providers,
        };
        page.build_adapter();
        page
    }

    pub fn provider(&self) -> MapProvider {
        self.provider
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    fn build_adapter(&mut self) {
        self.drop_adapter();
        if !self.providers.contains(&self.provider) {
            return;
        }
        match (self.new_library)() {
            Ok(library) => {
                self.adapter = Some(MapAdapter::new(library, self.provider));
                self.build_error = None;
            }
            Err(err) => {
                log::error!("cannot build map library: {err}");
                self.build_error = Some(err.user_message());
            }
        }
    }

    /// Pull every marker off the old widget before it is destroyed.
    fn drop_adapter(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            if let Some(widget) = adapter.widget_mut() {
                self.categories.teardown(&mut *widget);
                self.stars.teardown(&mut *widget);
            }
            adapter.teardown();
        }
        self.wiring = None;
    }

    pub fn switch_provider(&mut self, provider: MapProvider) {
        if provider == self.provider || !self.providers.contains(&provider) {
            return;
        }
        log::info!("switching map to {provider}");
        self.provider = provider;
        self.build_adapter();
    }

    pub fn show(&mut self, ui: &mut Ui, locale: Locale, bookmarks: &mut Bookmarks, changes: &[BookmarkChange]) {
        let now = Instant::now();
        self.receive(changes);
        self.wire_actions(locale, bookmarks.has_session());

        if self.providers.is_empty() {
            ui.centered_and_justified(|ui| ui.heading(tr(locale, "map.noProvider")));
            return;
        }

        if self.poll_adapter(now) {
            ui.ctx().request_repaint_after(crate::map::adapter::POLL_INTERVAL);
        }

        let events = self.draw_map(ui, locale);
        self.handle_events(events, bookmarks, locale);

        self.overlays(ui, locale, bookmarks);
        self.push_state(bookmarks);
    }

    /// Drive library loading. Returns whether it is still loading.
    fn poll_adapter(&mut self, now: Instant) -> bool {
        let Some(adapter) = self.adapter.as_mut() else {
            return false;
        };
        !adapter.poll(now, &self.state) && *adapter.status() == AdapterStatus::Loading
    }

    fn wire_actions(&mut self, locale: Locale, signed_in: bool) {
        if self.wiring == Some((locale, signed_in)) {
            return;
        }
        self.wiring = Some((locale, signed_in));
        self.stars.set_remove_label(tr(locale, "map.removeBookmark"));
        if signed_in {
            self.categories.wire_bookmark_actions(tr(locale, "map.addBookmark"));
        } else {
            self.categories.unwire_bookmark_actions();
        }
    }

    fn receive(&mut self, changes: &[BookmarkChange]) {
        let widget = self.adapter.as_mut().and_then(|a| a.widget_mut());
        if let Some(widget) = widget {
            for (token, category, result) in self.category_tasks.drain() {
                let placed = self.categories.apply_results(&mut *widget, token, category, result);
                log::debug!("{} markers for {}", placed, category.code());
            }
            for change in changes {
                if let BookmarkChange::Removed(id) = change {
                    self.stars.on_removed(&mut *widget, id);
                }
            }
        } else {
            // No widget to draw on; the next sync will search again.
            self.category_tasks.drain();
        }

        for (seq, result) in self.keyword_tasks.drain() {
            self.search_box.apply_results(seq, result);
        }

        for result in self.locate_tasks.drain() {
            self.on_located(result);
        }
    }

    /// A failed lookup is only logged.
    fn on_located(&mut self, result: Result<LatLng>) {
        match result {
            Ok(position) => {
                log::debug!("located at {:.5},{:.5}", position.lat, position.lng);
                self.state.select_and_search(position);
            }
            Err(err) => log::debug!("geolocation failed: {err}"),
        }
    }

    fn draw_map(&mut self, ui: &mut Ui, locale: Locale) -> Vec<AdapterEvent> {
        if let Some(message) = &self.build_error {
            ui.centered_and_justified(|ui| ui.colored_label(ui.visuals().error_fg_color, message));
            return Vec::new();
        }
        let Some(adapter) = self.adapter.as_mut() else {
            return Vec::new();
        };

        let mut retry = false;
        match adapter.status().clone() {
            AdapterStatus::Loading => {
                ui.centered_and_justified(|ui| {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(tr(locale, "map.loading"));
                    });
                });
            }
            AdapterStatus::Failed(message) => {
                ui.vertical_centered(|ui| {
                    ui.add_space(ui.available_height() / 3.0);
                    ui.heading(tr(locale, "map.loadFailed"));
                    ui.colored_label(ui.visuals().error_fg_color, message);
                    retry = ui.button(tr(locale, "map.retry")).clicked();
                });
            }
            AdapterStatus::Ready => {
                let outcome = self.boundary.show(ui, locale, |ui| {
                    if let Some(widget) = adapter.widget_mut() {
                        let _ = widget.show(ui);
                    }
                });
                if let Boundary::Failed { retry: clicked } = outcome {
                    retry = clicked;
                }
            }
        }

        if retry {
            self.build_adapter();
            return Vec::new();
        }
        self.take_events()
    }

    /// Widget events with the view changes already applied to the state.
    fn take_events(&mut self) -> Vec<AdapterEvent> {
        let Some(adapter) = self.adapter.as_mut() else {
            return Vec::new();
        };
        let events = adapter.pump();
        adapter.apply_to(events, &mut self.state)
    }

    fn handle_events(&mut self, events: Vec<AdapterEvent>, bookmarks: &mut Bookmarks, locale: Locale) {
        let Some(widget) = self.adapter.as_mut().and_then(|a| a.widget_mut()) else {
            return;
        };
        let signed_in = bookmarks.has_session();
        for event in events {
            match event {
                AdapterEvent::Click(position) => {
                    widget.close_popup();
                    self.state.set_selected_location(position);
                    self.state.trigger_search();
                }
                AdapterEvent::RightClick(position) if signed_in => {
                    widget.close_popup();
                    widget.open_popup(PopupAnchor::Position(position), dropped_pin_popup(locale, position));
                }
                AdapterEvent::MarkerClicked(handle) => {
                    if !self.categories.on_marker_clicked(&mut *widget, handle) {
                        self.stars.on_marker_clicked(&mut *widget, handle);
                    }
                }
                AdapterEvent::PopupAction(PopupAction::AddBookmark {
                    name,
                    address,
                    position,
                }) => {
                    if let Err(err) = bookmarks.add(name, position, address) {
                        log::warn!("cannot add bookmark: {err}");
                    }
                    widget.close_popup();
                }
                AdapterEvent::PopupAction(PopupAction::RemoveBookmark { id }) => {
                    if let Err(err) = bookmarks.remove(id) {
                        log::warn!("cannot remove bookmark: {err}");
                    }
                }
                AdapterEvent::PopupClosed => widget.close_popup(),
                AdapterEvent::RightClick(_) | AdapterEvent::CenterChanged(_) | AdapterEvent::ZoomChanged(_) => {}
            }
        }
    }

    fn overlays(&mut self, ui: &mut Ui, locale: Locale, bookmarks: &mut Bookmarks) {
        let ctx = ui.ctx().clone();
        let rect = ui.max_rect();

        let search_enabled = self.place_search.is_some();
        let search_actions = egui::Area::new(egui::Id::new("map_search"))
            .fixed_pos(rect.left_top() + egui::vec2(12.0, 12.0))
            .show(&ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .show(ui, |ui| {
                        self.search_box.show(
                            ui,
                            locale,
                            search_enabled,
                            |p| bookmarks.is_bookmarked(p),
                            bookmarks.has_session(),
                        )
                    })
                    .inner
            })
            .inner;
        for action in search_actions {
            self.on_search_action(action, bookmarks);
        }

        let panel = PanelContext {
            locale,
            provider: self.provider,
            providers: &self.providers,
            bookmarks: bookmarks.items(),
            signed_in: bookmarks.has_session(),
            locating: !self.locate_tasks.is_idle(),
        };
        let state = &mut self.state;
        let panel_actions = egui::Area::new(egui::Id::new("map_controls"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-12.0, rect.top() + 12.0))
            .show(&ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .show(ui, |ui| {
                        ui.set_width(240.0);
                        control_panel::show(ui, state, &panel)
                    })
                    .inner
            })
            .inner;
        for action in panel_actions {
            self.on_panel_action(action, bookmarks);
        }
    }

    fn on_search_action(&mut self, action: SearchBoxAction, bookmarks: &mut Bookmarks) {
        match action {
            SearchBoxAction::Search(request) => {
                let Some(search) = self.place_search.clone() else {
                    return;
                };
                let seq = request.seq;
                self.keyword_tasks.spawn(async move {
                    let result = search
                        .keyword_search(KeywordSearch {
                            query: request.query,
                            size: MAX_SUGGESTIONS,
                        })
                        .await;
                    (seq, result)
                });
            }
            SearchBoxAction::Commit(place) => match place.position() {
                Some(position) => self.state.select_and_search(position),
                None => log::warn!("suggestion {:?} has no coordinates", place.place_name),
            },
            SearchBoxAction::ToggleBookmark(place) => toggle_bookmark(bookmarks, &place),
        }
    }

    fn on_panel_action(&mut self, action: PanelAction, bookmarks: &mut Bookmarks) {
        match action {
            PanelAction::LocateMe => {
                let geolocator = self.geolocator.clone();
                self.locate_tasks.spawn(async move { geolocator.locate().await });
            }
            PanelAction::SwitchProvider(provider) => self.switch_provider(provider),
            PanelAction::FocusBookmark(position) => self.state.set_center(position),
            PanelAction::RemoveBookmark(id) => {
                if let Err(err) = bookmarks.remove(id) {
                    log::warn!("cannot remove bookmark: {err}");
                }
            }
        }
    }

    /// Store → widget, then markers.
    fn push_state(&mut self, bookmarks: &Bookmarks) {
        let Some(adapter) = self.adapter.as_mut() else {
            return;
        };
        adapter.sync(&self.state);
        let Some(widget) = adapter.widget_mut() else {
            return;
        };

        let query = CategoryQuery::from_state(&self.state);
        let issued = self.categories.sync(&mut *widget, &query);
        self.stars.sync(&mut *widget, bookmarks.items());

        if let Some(search) = &self.place_search {
            for IssuedSearch { token, request } in issued {
                let search = Arc::clone(search);
                let category = request.category;
                self.category_tasks.spawn(async move {
                    let result = search.category_search(request).await;
                    (token, category, result)
                });
            }
        }
    }
}

impl<L: MapLibrary> Drop for MapPage<L> {
    fn drop(&mut self) {
        self.drop_adapter();
    }
}

fn tasks<T: Send + 'static>(handle: &Handle, repaint: &egui::Context) -> Tasks<T> {
    Tasks::new(handle.clone()).with_repaint(repaint.clone())
}

fn dropped_pin_popup(locale: Locale, position: LatLng) -> PopupContent {
    let name = tr(locale, "map.droppedPin").to_string();
    PopupContent {
        title: name.clone(),
        link: None,
        lines: vec![format!("{:.5}, {:.5}", position.lat, position.lng)],
        button: Some(PopupButton {
            label: tr(locale, "map.bookmarkHere").to_string(),
            action: PopupAction::AddBookmark {
                name,
                address: None,
                position,
            },
        }),
    }
}

/// Add the place, or remove the bookmark already sitting on it.
fn toggle_bookmark(bookmarks: &mut Bookmarks, place: &PlaceResult) {
    let Some(position) = place.position() else {
        return;
    };
    let result = match bookmarks.find_at(position) {
        Some(existing) => {
            let id = existing.id.clone();
            bookmarks.remove(id)
        }
        None => {
            let address = Some(place.display_address().to_string()).filter(|a| !a.is_empty());
            bookmarks.add(place.place_name.clone(), position, address)
        }
    };
    if let Err(err) = result {
        log::warn!("bookmark toggle failed: {err}");
    }
}
