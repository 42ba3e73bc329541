//! Keeps one map widget and the shared view state in step.

use std::time::{Duration, Instant};

use approx::abs_diff_eq;

use crate::error::AppError;
use crate::state::ViewState;

use super::geo::LatLng;
use super::level::MapProvider;
use super::library::{MapLibrary, WidgetOptions};
use super::widget::{MapWidget, MarkerHandle, PopupAction, WidgetEvent};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames a programmatic update may wait for its echo before it is forgotten.
pub const GUARD_TICKS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterStatus {
    Loading,
    Ready,
    Failed(String),
}

/// A widget event translated into the app's units.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    CenterChanged(LatLng),
    ZoomChanged(i32),
    Click(LatLng),
    RightClick(LatLng),
    MarkerClicked(MarkerHandle),
    PopupAction(PopupAction),
    PopupClosed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GuardTarget {
    Center(LatLng),
    Level(i32),
}

#[derive(Debug)]
struct PendingUpdate {
    id: u64,
    target: GuardTarget,
    ticks_left: u32,
}

/// Suppresses the widget's echo of changes the app made itself.
///
/// Each programmatic update is recorded with the value it asked for. A change
/// event carrying that value consumes the record and is dropped; a change to
/// any other value is the user's and passes through. Records whose echo never
/// arrives expire after [`GUARD_TICKS`] pumps.
#[derive(Debug, Default)]
pub struct UpdateGuard {
    next_id: u64,
    pending: Vec<PendingUpdate>,
}

impl UpdateGuard {
    fn begin(&mut self, target: GuardTarget) -> u64 {
        self.next_id += 1;
        self.pending.push(PendingUpdate {
            id: self.next_id,
            target,
            ticks_left: GUARD_TICKS,
        });
        self.next_id
    }

    fn acknowledge(&mut self, event: &WidgetEvent) -> bool {
        let matched = self.pending.iter().position(|p| match (p.target, event) {
            (GuardTarget::Center(want), WidgetEvent::CenterChanged(got)) => {
                abs_diff_eq!(want.lat, got.lat, epsilon = 1e-9)
                    && abs_diff_eq!(want.lng, got.lng, epsilon = 1e-9)
            }
            (GuardTarget::Level(want), WidgetEvent::LevelChanged(got)) => want == *got,
            _ => false,
        });
        match matched {
            Some(index) => {
                let done = self.pending.remove(index);
                log::trace!("update {} acknowledged", done.id);
                true
            }
            None => false,
        }
    }

    fn tick(&mut self) {
        self.pending.retain_mut(|p| {
            p.ticks_left = p.ticks_left.saturating_sub(1);
            p.ticks_left > 0
        });
    }

    pub fn is_active(&self) -> bool {
        !self.pending.is_empty()
    }
}

pub struct MapAdapter<L: MapLibrary> {
    library: L,
    provider: MapProvider,
    status: AdapterStatus,
    timeout: Duration,
    started: Option<Instant>,
    last_check: Option<Instant>,
    widget: Option<L::Widget>,
    first_sync: bool,
    guard: UpdateGuard,
}

impl<L: MapLibrary> MapAdapter<L> {
    pub fn new(library: L, provider: MapProvider) -> Self {
        Self {
            library,
            provider,
            status: AdapterStatus::Loading,
            timeout: LOAD_TIMEOUT,
            started: None,
            last_check: None,
            widget: None,
            first_sync: true,
            guard: UpdateGuard::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> MapProvider {
        self.provider
    }

    pub fn status(&self) -> &AdapterStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == AdapterStatus::Ready
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            AdapterStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Drive library loading. Constructs the widget at the state's current
    /// center and zoom once the library is usable. Returns `true` on the call
    /// that made the adapter ready.
    pub fn poll(&mut self, now: Instant, state: &ViewState) -> bool {
        if self.status != AdapterStatus::Loading {
            return false;
        }
        let started = *self.started.get_or_insert(now);
        if let Some(last) = self.last_check {
            if now.saturating_duration_since(last) < POLL_INTERVAL {
                return false;
            }
        }
        self.last_check = Some(now);

        if self.library.is_available() {
            let options = WidgetOptions {
                provider: self.provider,
                center: state.center(),
                level: self.provider.zoom_to_level(state.zoom()),
            };
            let created = self
                .library
                .load()
                .and_then(|()| self.library.create(options));
            return match created {
                Ok(widget) => {
                    log::info!("{} map ready ({})", self.provider, self.library.name());
                    self.widget = Some(widget);
                    self.status = AdapterStatus::Ready;
                    true
                }
                Err(err) => {
                    self.fail(err);
                    false
                }
            };
        }

        if now.saturating_duration_since(started) > self.timeout {
            self.fail(AppError::LibraryTimeout(self.timeout.as_millis()));
        }
        false
    }

    fn fail(&mut self, err: AppError) {
        log::error!("{} map failed to load: {err}", self.provider);
        self.status = AdapterStatus::Failed(err.user_message());
    }

    pub fn update_center(&mut self, center: LatLng) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        if widget.center() == center {
            return;
        }
        self.guard.begin(GuardTarget::Center(center));
        widget.set_center(center);
    }

    pub fn update_zoom(&mut self, zoom: i32) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        let level = self.provider.zoom_to_level(zoom);
        if widget.level() == level {
            return;
        }
        self.guard.begin(GuardTarget::Level(level));
        widget.set_level(level);
    }

    /// Push the state's center and zoom into the widget. The first call after
    /// construction leaves the center alone: the widget was built there.
    pub fn sync(&mut self, state: &ViewState) {
        if self.widget.is_none() {
            return;
        }
        if self.first_sync {
            self.first_sync = false;
        } else {
            self.update_center(state.center());
        }
        self.update_zoom(state.zoom());
    }

    /// Collect the widget's events, minus the echoes of our own updates.
    pub fn pump(&mut self) -> Vec<AdapterEvent> {
        let Some(widget) = self.widget.as_mut() else {
            return Vec::new();
        };
        let provider = self.provider;
        let mut out = Vec::new();
        for event in widget.drain_events() {
            if self.guard.acknowledge(&event) {
                continue;
            }
            out.push(match event {
                WidgetEvent::CenterChanged(c) => AdapterEvent::CenterChanged(c),
                WidgetEvent::LevelChanged(level) => AdapterEvent::ZoomChanged(provider.level_to_zoom(level)),
                WidgetEvent::Click(p) => AdapterEvent::Click(p),
                WidgetEvent::RightClick(p) => AdapterEvent::RightClick(p),
                WidgetEvent::MarkerClicked(h) => AdapterEvent::MarkerClicked(h),
                WidgetEvent::PopupAction(a) => AdapterEvent::PopupAction(a),
                WidgetEvent::PopupClosed => AdapterEvent::PopupClosed,
            });
        }
        self.guard.tick();
        out
    }

    /// Feed translated events into the state. Events the state does not own
    /// (clicks, popup actions) are handed back to the caller.
    pub fn apply_to(&self, events: Vec<AdapterEvent>, state: &mut ViewState) -> Vec<AdapterEvent> {
        let mut rest = Vec::new();
        for event in events {
            match event {
                AdapterEvent::CenterChanged(c) => state.set_center(c),
                AdapterEvent::ZoomChanged(z) => state.set_zoom(z),
                other => rest.push(other),
            }
        }
        rest
    }

    pub fn widget(&self) -> Option<&L::Widget> {
        self.widget.as_ref()
    }

    pub fn widget_mut(&mut self) -> Option<&mut L::Widget> {
        self.widget.as_mut()
    }

    pub fn guard_active(&self) -> bool {
        self.guard.is_active()
    }

    pub fn teardown(&mut self) {
        if let Some(mut widget) = self.widget.take() {
            widget.destroy();
            log::debug!("{} map destroyed", self.provider);
        }
    }
}

impl<L: MapLibrary> Drop for MapAdapter<L> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::testing::FakeLibrary;

    fn ready_adapter(provider: MapProvider, state: &ViewState) -> MapAdapter<FakeLibrary> {
        let mut adapter = MapAdapter::new(FakeLibrary::available_after(0), provider);
        assert!(adapter.poll(Instant::now(), state));
        adapter
    }

    #[test]
    fn polls_until_the_library_shows_up() {
        let state = ViewState::default();
        let library = FakeLibrary::available_after(3);
        let loads = library.load_calls.clone();
        let mut adapter = MapAdapter::new(library, MapProvider::Kakao);
        let t0 = Instant::now();

        assert!(!adapter.poll(t0, &state));
        // Too soon after the previous check.
        assert!(!adapter.poll(t0 + Duration::from_millis(50), &state));
        assert!(!adapter.poll(t0 + Duration::from_millis(100), &state));
        assert!(adapter.poll(t0 + Duration::from_millis(200), &state));
        assert!(adapter.is_ready());
        assert_eq!(*loads.borrow(), 1);

        // Readiness flips once.
        assert!(!adapter.poll(t0 + Duration::from_millis(300), &state));
        assert_eq!(*loads.borrow(), 1);
    }

    #[test]
    fn times_out_with_a_terminal_error() {
        let state = ViewState::default();
        let mut adapter = MapAdapter::new(FakeLibrary::never_available(), MapProvider::Kakao);
        let t0 = Instant::now();
        let mut t = t0;
        while t <= t0 + Duration::from_secs(11) {
            adapter.poll(t, &state);
            t += POLL_INTERVAL;
        }
        assert_eq!(
            adapter.error(),
            Some("map library load timed out after 10000 ms")
        );
        assert!(adapter.widget().is_none());
    }

    #[test]
    fn construction_failure_is_terminal() {
        let state = ViewState::default();
        let mut library = FakeLibrary::available_after(0);
        library.fail_create = true;
        let mut adapter = MapAdapter::new(library, MapProvider::Naver);
        assert!(!adapter.poll(Instant::now(), &state));
        assert_eq!(adapter.error(), Some("map initialization failed: no container"));
        assert!(!adapter.poll(Instant::now() + Duration::from_secs(1), &state));
    }

    #[test]
    fn widget_is_built_at_the_current_state() {
        let mut state = ViewState::default();
        state.set_zoom(16);
        let adapter = ready_adapter(MapProvider::Kakao, &state);
        let widget = adapter.widget().unwrap();
        assert_eq!(widget.center(), state.center());
        assert_eq!(widget.level(), 5);
    }

    #[test]
    fn first_sync_does_not_recenter() {
        let state = ViewState::default();
        let mut adapter = ready_adapter(MapProvider::Kakao, &state);
        let log = adapter.widget().unwrap().log.clone();
        adapter.sync(&state);
        assert_eq!(log.borrow().set_center_calls, 0);
    }

    #[test]
    fn programmatic_updates_are_not_echoed_back() {
        let mut state = ViewState::default();
        let mut adapter = ready_adapter(MapProvider::Kakao, &state);
        adapter.sync(&state);

        let target = LatLng::new(37.4979, 127.0276);
        state.set_center(target);
        state.set_zoom(15);
        adapter.sync(&state);
        assert!(adapter.guard_active());

        let events = adapter.pump();
        assert!(events.is_empty(), "echoes leaked: {events:?}");
        assert!(!adapter.guard_active());
        assert_eq!(adapter.widget().unwrap().level(), 6);
    }

    #[test]
    fn user_changes_pass_through_while_guarded() {
        let mut state = ViewState::default();
        let mut adapter = ready_adapter(MapProvider::Kakao, &state);
        adapter.sync(&state);

        state.set_center(LatLng::new(37.0, 127.0));
        adapter.sync(&state);
        let dragged = LatLng::new(36.0, 128.0);
        adapter.widget_mut().unwrap().user_pan(dragged);
        adapter.widget_mut().unwrap().user_zoom(3);

        let events = adapter.pump();
        assert_eq!(
            events,
            vec![AdapterEvent::CenterChanged(dragged), AdapterEvent::ZoomChanged(18)]
        );

        let rest = adapter.apply_to(events, &mut state);
        assert!(rest.is_empty());
        assert_eq!(state.center(), dragged);
        assert_eq!(state.zoom(), 18);

        // Store now agrees with the widget, so the next sync is a no-op.
        let log = adapter.widget().unwrap().log.clone();
        let calls = log.borrow().set_center_calls;
        adapter.sync(&state);
        assert_eq!(log.borrow().set_center_calls, calls);
    }

    #[test]
    fn unacknowledged_updates_expire() {
        let state = ViewState::default();
        let mut adapter = ready_adapter(MapProvider::Kakao, &state);
        adapter.sync(&state);
        adapter.update_center(LatLng::new(1.0, 1.0));
        // Drop the echo on the floor.
        adapter.widget_mut().unwrap().drain_events();
        for _ in 0..GUARD_TICKS {
            adapter.pump();
        }
        assert!(!adapter.guard_active());
    }

    #[test]
    fn teardown_destroys_the_widget() {
        let state = ViewState::default();
        let adapter = ready_adapter(MapProvider::Naver, &state);
        let log = adapter.widget().unwrap().log.clone();
        drop(adapter);
        assert!(log.borrow().destroyed);
    }
}
