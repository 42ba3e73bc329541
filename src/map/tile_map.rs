//! The built-in raster tile map widget.

use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use egui::{
    pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Response, Sense, Shape, Stroke, Ui,
};
use lru::LruCache;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tokio::runtime::Handle;

use crate::error::Result;
use crate::maps_api::tile_retriever::{TileKey, TileRetriever};
use crate::tasks::Tasks;

use super::geo::{meters_per_pixel, LatLng, TILE_SIZE};
use super::icons::{IconShape, MarkerIcon};
use super::level::{MapProvider, MAX_TILE_ZOOM};
use super::library::WidgetOptions;
use super::map_tile::MapTile;
use super::widget::{
    CircleOverlay, MapWidget, MarkerHandle, MarkerSpec, PopupAnchor, PopupContent, WidgetEvent,
};

const TILE_CACHE_SIZE: usize = 512;
/// Accumulated scroll needed for one level step.
const SCROLL_PER_LEVEL: f32 = 50.0;
/// Markers further than this from a click are not hit-tested at all.
const HIT_RADIUS_PX: f64 = 48.0;
/// First wait before a failed tile is fetched again; doubles per failure.
const TILE_RETRY_BASE: Duration = Duration::from_secs(2);
const TILE_RETRY_MAX: Duration = Duration::from_secs(60);
const FAILED_TILE_MEMORY: usize = 256;

#[derive(Debug, Clone, Copy)]
struct TileRetry {
    attempts: u32,
    not_before: Instant,
}

/// Decoded tiles plus the requests still in flight.
pub struct TileStore {
    cache: LruCache<TileKey, MapTile>,
    pending: HashSet<TileKey>,
    failed: LruCache<TileKey, TileRetry>,
    tasks: Tasks<(TileKey, Result<MapTile>)>,
    retriever: TileRetriever,
}

fn retry_delay(attempts: u32) -> Duration {
    TILE_RETRY_BASE
        .saturating_mul(1 << attempts.saturating_sub(1).min(16))
        .min(TILE_RETRY_MAX)
}

impl TileStore {
    pub fn new(retriever: TileRetriever, handle: Handle, repaint: Option<egui::Context>) -> Self {
        let mut tasks = Tasks::new(handle);
        if let Some(ctx) = repaint {
            tasks = tasks.with_repaint(ctx);
        }
        Self {
            cache: LruCache::new(NonZeroUsize::new(TILE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
            pending: HashSet::new(),
            failed: LruCache::new(NonZeroUsize::new(FAILED_TILE_MEMORY).unwrap_or(NonZeroUsize::MIN)),
            tasks,
            retriever,
        }
    }

    pub fn insert(&mut self, key: TileKey, tile: MapTile) {
        self.pending.remove(&key);
        self.failed.pop(&key);
        self.cache.put(key, tile);
    }

    fn request(&mut self, key: TileKey, now: Instant) {
        if self.pending.contains(&key) || self.cache.contains(&key) {
            return;
        }
        if self.failed.peek(&key).is_some_and(|retry| now < retry.not_before) {
            return;
        }
        let retriever = self.retriever.clone();
        self.pending.insert(key);
        self.tasks.spawn(async move { (key, retriever.fetch_tile(key).await) });
    }

    fn receive(&mut self, now: Instant) {
        for (key, result) in self.tasks.drain() {
            self.finish(key, result, now);
        }
    }

    fn finish(&mut self, key: TileKey, result: Result<MapTile>, now: Instant) {
        match result {
            Ok(tile) => self.insert(key, tile),
            Err(e) => {
                self.pending.remove(&key);
                let attempts = self.failed.peek(&key).map_or(0, |retry| retry.attempts) + 1;
                let delay = retry_delay(attempts);
                log::warn!("tile {}/{}/{} failed ({e}), retrying in {delay:?}", key.z, key.x, key.y);
                self.failed.put(
                    key,
                    TileRetry {
                        attempts,
                        not_before: now + delay,
                    },
                );
            }
        }
    }

    /// Earliest moment a failed tile may be fetched again.
    fn next_retry(&self) -> Option<Instant> {
        self.failed.iter().map(|(_, retry)| retry.not_before).min()
    }

    fn clear(&mut self) {
        self.cache.clear();
        self.pending.clear();
        self.failed.clear();
    }
}

/// Marker position in zoom-0 world pixels, for hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MarkerPoint {
    handle: MarkerHandle,
    world: [f64; 2],
}

impl RTreeObject for MarkerPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.world)
    }
}

impl PointDistance for MarkerPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.world[0] - point[0];
        let dy = self.world[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Tiles covering `rect` around `center`, with their screen rectangles.
/// Beyond [`MAX_TILE_ZOOM`] the deepest tiles are stretched.
fn tile_grid(center: LatLng, zoom: f64, rect: Rect) -> Vec<(TileKey, Rect)> {
    let zoom = zoom.floor().max(0.0);
    let z = (zoom as u32).min(MAX_TILE_ZOOM);
    let tile_px = TILE_SIZE * 2.0_f64.powi(zoom as i32 - z as i32);
    let n = 1_i64 << z;
    let (cx, cy) = center.to_world(zoom);
    let min_x = cx - rect.width() as f64 / 2.0;
    let min_y = cy - rect.height() as f64 / 2.0;

    let x0 = (min_x / tile_px).floor() as i64;
    let x1 = ((min_x + rect.width() as f64) / tile_px).floor() as i64;
    let y0 = ((min_y / tile_px).floor() as i64).max(0);
    let y1 = (((min_y + rect.height() as f64) / tile_px).floor() as i64).min(n - 1);

    let mut grid = Vec::new();
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let key = TileKey {
                z,
                x: tx.rem_euclid(n) as u32,
                y: ty as u32,
            };
            let min = rect.min + vec2((tx as f64 * tile_px - min_x) as f32, (ty as f64 * tile_px - min_y) as f32);
            grid.push((key, Rect::from_min_size(min, vec2(tile_px as f32, tile_px as f32))));
        }
    }
    grid
}

pub struct TileMap {
    provider: MapProvider,
    center: LatLng,
    level: i32,
    markers: BTreeMap<MarkerHandle, MarkerSpec>,
    index: RTree<MarkerPoint>,
    index_dirty: bool,
    next_handle: u64,
    popup: Option<(PopupAnchor, PopupContent)>,
    circle: Option<CircleOverlay>,
    events: Vec<WidgetEvent>,
    tiles: TileStore,
    scroll: f32,
    destroyed: bool,
}

impl TileMap {
    pub fn new(options: WidgetOptions, tiles: TileStore) -> Self {
        let (min, max) = options.provider.level_range();
        Self {
            provider: options.provider,
            center: options.center,
            level: options.level.clamp(min, max),
            markers: BTreeMap::new(),
            index: RTree::new(),
            index_dirty: false,
            next_handle: 0,
            popup: None,
            circle: None,
            events: Vec::new(),
            tiles,
            scroll: 0.0,
            destroyed: false,
        }
    }

    fn tile_zoom(&self) -> f64 {
        self.provider.tile_zoom(self.level)
    }

    fn to_screen(&self, rect: Rect, point: LatLng) -> Pos2 {
        let zoom = self.tile_zoom();
        let (cx, cy) = self.center.to_world(zoom);
        let (x, y) = point.to_world(zoom);
        rect.center() + vec2((x - cx) as f32, (y - cy) as f32)
    }

    fn to_geo(&self, rect: Rect, pos: Pos2) -> LatLng {
        let zoom = self.tile_zoom();
        let (cx, cy) = self.center.to_world(zoom);
        let offset = pos - rect.center();
        LatLng::from_world(cx + offset.x as f64, cy + offset.y as f64, zoom)
    }

    fn rebuild_index(&mut self) {
        if !self.index_dirty {
            return;
        }
        let points = self
            .markers
            .iter()
            .map(|(handle, spec)| {
                let (x, y) = spec.position.to_world(0.0);
                MarkerPoint {
                    handle: *handle,
                    world: [x, y],
                }
            })
            .collect();
        self.index = RTree::bulk_load(points);
        self.index_dirty = false;
    }

    /// Topmost marker whose icon covers `pos`.
    fn hit_test(&mut self, rect: Rect, pos: Pos2) -> Option<MarkerHandle> {
        self.rebuild_index();
        let scale = 2.0_f64.powf(self.tile_zoom());
        let at = self.to_geo(rect, pos).to_world(0.0);
        let radius = HIT_RADIUS_PX / scale;
        self.index
            .locate_within_distance([at.0, at.1], radius * radius)
            .filter(|point| {
                self.markers.get(&point.handle).is_some_and(|spec| {
                    let anchor = self.to_screen(rect, spec.position);
                    icon_rect(anchor, &spec.icon).contains(pos)
                })
            })
            .map(|point| point.handle)
            .max()
    }

    fn step_level(&mut self, steps_in: i32) {
        let (min, max) = self.provider.level_range();
        let level = (self.level + steps_in * self.provider.zoom_in_step()).clamp(min, max);
        if level != self.level {
            self.level = level;
            self.events.push(WidgetEvent::LevelChanged(level));
        }
    }

    /// Draw the map into the remaining space of `ui` and translate input into events.
    fn draw(&mut self, ui: &mut Ui) -> Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        if self.destroyed {
            return response;
        }
        self.tiles.receive(Instant::now());

        if response.dragged() {
            let delta = response.drag_delta();
            if delta != egui::Vec2::ZERO {
                let zoom = self.tile_zoom();
                let (cx, cy) = self.center.to_world(zoom);
                self.center = LatLng::from_world(cx - delta.x as f64, cy - delta.y as f64, zoom);
                self.events.push(WidgetEvent::CenterChanged(self.center));
            }
        }

        if response.hovered() {
            let pinch = ui.input(|i| i.zoom_delta());
            if pinch > 1.0 + f32::EPSILON {
                self.step_level(1);
            } else if pinch < 1.0 - f32::EPSILON {
                self.step_level(-1);
            } else {
                self.scroll += ui.input(|i| i.smooth_scroll_delta.y);
                if self.scroll.abs() >= SCROLL_PER_LEVEL {
                    self.step_level(self.scroll.signum() as i32);
                    self.scroll = 0.0;
                }
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                match self.hit_test(rect, pos) {
                    Some(handle) => self.events.push(WidgetEvent::MarkerClicked(handle)),
                    None => self.events.push(WidgetEvent::Click(self.to_geo(rect, pos))),
                }
            }
        }
        if response.secondary_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.events.push(WidgetEvent::RightClick(self.to_geo(rect, pos)));
            }
        }

        let painter = ui.painter().with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, Color32::from_gray(40));
        self.paint_tiles(ui.ctx(), &painter, rect);
        self.paint_circle(&painter, rect);
        for spec in self.markers.values() {
            let anchor = self.to_screen(rect, spec.position);
            paint_icon(&painter, icon_rect(anchor, &spec.icon), &spec.icon);
        }
        self.show_popup(ui.ctx(), rect);

        response
    }

    fn paint_tiles(&mut self, ctx: &egui::Context, painter: &egui::Painter, rect: Rect) {
        let now = Instant::now();
        for (key, tile_rect) in tile_grid(self.center, self.tile_zoom(), rect) {
            match self.tiles.cache.get_mut(&key) {
                Some(tile) => {
                    let texture = tile.texture(ctx);
                    painter.image(
                        texture.id(),
                        tile_rect,
                        Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
                None => {
                    painter.rect_filled(tile_rect.shrink(0.5), 0.0, Color32::from_gray(70));
                    self.tiles.request(key, now);
                }
            }
        }
        if let Some(at) = self.tiles.next_retry() {
            ctx.request_repaint_after(at.saturating_duration_since(now));
        }
    }

    fn paint_circle(&self, painter: &egui::Painter, rect: Rect) {
        let Some(circle) = self.circle else {
            return;
        };
        let center = self.to_screen(rect, circle.center);
        let radius = (circle.radius_m / meters_per_pixel(circle.center.lat, self.tile_zoom())) as f32;
        painter.circle(
            center,
            radius,
            circle.color.gamma_multiply(0.08),
            Stroke::new(2.0, circle.color.gamma_multiply(0.6)),
        );
    }

    fn popup_position(&self, rect: Rect, anchor: PopupAnchor) -> Option<Pos2> {
        match anchor {
            PopupAnchor::Position(p) => Some(self.to_screen(rect, p)),
            PopupAnchor::Marker(handle) => self.markers.get(&handle).map(|spec| {
                let tip = self.to_screen(rect, spec.position);
                tip - vec2(0.0, spec.icon.anchor.y)
            }),
        }
    }

    fn show_popup(&mut self, ctx: &egui::Context, rect: Rect) {
        let Some((anchor, content)) = self.popup.clone() else {
            return;
        };
        let Some(pos) = self.popup_position(rect, anchor) else {
            return;
        };
        if !rect.contains(pos) {
            return;
        }

        let mut close = false;
        let mut action = None;
        egui::Area::new(egui::Id::new("map_popup"))
            .order(egui::Order::Foreground)
            .fixed_pos(pos)
            .pivot(Align2::CENTER_BOTTOM)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(260.0);
                    ui.horizontal(|ui| {
                        match &content.link {
                            Some(link) => {
                                ui.hyperlink_to(egui::RichText::new(&content.title).strong(), link);
                            }
                            None => {
                                ui.strong(&content.title);
                            }
                        }
                        if ui.small_button("✕").clicked() {
                            close = true;
                        }
                    });
                    for line in &content.lines {
                        ui.small(line);
                    }
                    if let Some(button) = &content.button {
                        if ui.button(&button.label).clicked() {
                            action = Some(button.action.clone());
                        }
                    }
                });
            });

        if let Some(action) = action {
            self.events.push(WidgetEvent::PopupAction(action));
        }
        if close {
            self.popup = None;
            self.events.push(WidgetEvent::PopupClosed);
        }
    }
}

fn icon_rect(anchor: Pos2, icon: &MarkerIcon) -> Rect {
    Rect::from_min_size(anchor - icon.anchor, icon.size)
}

fn paint_icon(painter: &egui::Painter, rect: Rect, icon: &MarkerIcon) {
    match icon.shape {
        IconShape::Pin => {
            let r = rect.width() / 2.0;
            let head = pos2(rect.center().x, rect.top() + r);
            painter.add(Shape::convex_polygon(
                vec![
                    pos2(head.x - r * 0.87, head.y + r * 0.5),
                    pos2(head.x + r * 0.87, head.y + r * 0.5),
                    pos2(head.x, rect.bottom()),
                ],
                icon.fill,
                Stroke::NONE,
            ));
            painter.circle(head, r, icon.fill, Stroke::new(1.5, icon.stroke));
            painter.circle_filled(head, r * 0.36, Color32::WHITE);
        }
        IconShape::Star => {
            let r = rect.width() / 2.0;
            painter.circle(rect.center(), r, icon.fill, Stroke::new(1.5, icon.stroke));
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "★",
                FontId::proportional(r * 1.3),
                Color32::WHITE,
            );
        }
    }
}

impl MapWidget for TileMap {
    fn show(&mut self, ui: &mut Ui) -> Response {
        self.draw(ui)
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn set_center(&mut self, center: LatLng) {
        if self.destroyed || self.center == center {
            return;
        }
        self.center = center;
        self.events.push(WidgetEvent::CenterChanged(center));
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn set_level(&mut self, level: i32) {
        let (min, max) = self.provider.level_range();
        let level = level.clamp(min, max);
        if self.destroyed || self.level == level {
            return;
        }
        self.level = level;
        self.events.push(WidgetEvent::LevelChanged(level));
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        if !self.destroyed {
            self.markers.insert(handle, marker);
            self.index_dirty = true;
        }
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> bool {
        if matches!(self.popup, Some((PopupAnchor::Marker(h), _)) if h == handle) {
            self.popup = None;
        }
        let removed = self.markers.remove(&handle).is_some();
        self.index_dirty |= removed;
        removed
    }

    fn marker_count(&self) -> usize {
        self.markers.len()
    }

    fn open_popup(&mut self, anchor: PopupAnchor, content: PopupContent) {
        if !self.destroyed {
            self.popup = Some((anchor, content));
        }
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
        self.destroyed = true;
        self.markers.clear();
        self.index = RTree::new();
        self.popup = None;
        self.circle = None;
        self.events.clear();
        self.tiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::AppError;

    fn tile_map(provider: MapProvider) -> TileMap {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let retriever = TileRetriever::new("http://127.0.0.1:9/{z}/{x}/{y}.png").unwrap();
        let store = TileStore::new(retriever, runtime.handle().clone(), None);
        TileMap::new(
            WidgetOptions {
                provider,
                center: LatLng::new(37.5665, 126.978),
                level: provider.zoom_to_level(13),
            },
            store,
        )
    }

    #[test]
    fn programmatic_changes_emit_change_events() {
        let mut map = tile_map(MapProvider::Kakao);
        map.set_center(LatLng::new(37.0, 127.0));
        map.set_center(LatLng::new(37.0, 127.0));
        map.set_level(40);
        assert_eq!(
            map.drain_events(),
            vec![
                WidgetEvent::CenterChanged(LatLng::new(37.0, 127.0)),
                WidgetEvent::LevelChanged(14),
            ]
        );
    }

    #[test]
    fn screen_and_geo_conversions_agree() {
        let map = tile_map(MapProvider::Naver);
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        assert_eq!(map.to_screen(rect, map.center()), rect.center());
        let p = map.to_geo(rect, pos2(500.0, 200.0));
        let back = map.to_screen(rect, p);
        assert!((back.x - 500.0).abs() < 0.01 && (back.y - 200.0).abs() < 0.01);
    }

    #[test]
    fn clicks_on_an_icon_hit_the_topmost_marker() {
        let mut map = tile_map(MapProvider::Kakao);
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let icon = Arc::new(MarkerIcon::pin(Color32::RED));
        let spec = MarkerSpec {
            position: map.center(),
            icon,
            title: "a".to_string(),
        };
        let lower = map.add_marker(spec.clone());
        let upper = map.add_marker(spec);
        assert!(upper > lower);

        // The pin body sits above its tip.
        let on_pin = rect.center() - vec2(0.0, 20.0);
        assert_eq!(map.hit_test(rect, on_pin), Some(upper));
        let beside = rect.center() + vec2(100.0, 0.0);
        assert_eq!(map.hit_test(rect, beside), None);

        map.remove_marker(upper);
        assert_eq!(map.hit_test(rect, on_pin), Some(lower));
    }

    #[test]
    fn removing_the_anchor_marker_closes_the_popup() {
        let mut map = tile_map(MapProvider::Kakao);
        let handle = map.add_marker(MarkerSpec {
            position: map.center(),
            icon: Arc::new(MarkerIcon::bookmark()),
            title: "b".to_string(),
        });
        map.open_popup(PopupAnchor::Marker(handle), PopupContent::default());
        assert!(map.remove_marker(handle));
        assert!(map.popup_anchor().is_none());
        assert!(!map.remove_marker(handle));
    }

    #[test]
    fn failed_tiles_are_retried_after_a_backoff() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let retriever = TileRetriever::new("http://127.0.0.1:9/{z}/{x}/{y}.png").unwrap();
        let mut store = TileStore::new(retriever, runtime.handle().clone(), None);
        let key = TileKey { z: 13, x: 6983, y: 3172 };
        let t0 = Instant::now();

        store.request(key, t0);
        assert_eq!(store.tasks.in_flight(), 1);
        store.finish(key, Err(AppError::api("tile server", 503, "busy")), t0);
        assert!(!store.pending.contains(&key));
        assert_eq!(store.next_retry(), Some(t0 + TILE_RETRY_BASE));

        store.request(key, t0 + Duration::from_secs(1));
        assert_eq!(store.tasks.in_flight(), 1, "still backing off");
        store.request(key, t0 + TILE_RETRY_BASE);
        assert_eq!(store.tasks.in_flight(), 2);
        assert!(store.pending.contains(&key));

        let t1 = t0 + TILE_RETRY_BASE;
        store.finish(key, Err(AppError::api("tile server", 503, "busy")), t1);
        assert_eq!(store.next_retry(), Some(t1 + TILE_RETRY_BASE * 2));

        store.finish(key, Ok(MapTile::new(key, [1, 1], vec![0; 4])), t1);
        assert!(store.next_retry().is_none());
    }

    #[test]
    fn retry_delay_doubles_up_to_a_minute() {
        assert_eq!(retry_delay(1), Duration::from_secs(2));
        assert_eq!(retry_delay(3), Duration::from_secs(8));
        assert_eq!(retry_delay(40), TILE_RETRY_MAX);
    }

    #[test]
    fn deepest_levels_stretch_the_last_published_tiles() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let center = LatLng::new(37.5665, 126.978);

        let native = tile_grid(center, 19.0, rect);
        assert!(native.iter().all(|(key, r)| key.z == 19 && r.width() == 256.0));

        let stretched = tile_grid(center, 21.0, rect);
        assert!(stretched.iter().all(|(key, r)| key.z == 19 && r.width() == 1024.0));
        assert!(stretched.len() < native.len());
        assert!(stretched.iter().any(|(_, r)| r.contains(rect.center())));
    }

    #[test]
    fn destroyed_map_ignores_further_changes() {
        let mut map = tile_map(MapProvider::Kakao);
        map.destroy();
        map.set_center(LatLng::new(0.0, 0.0));
        map.open_popup(PopupAnchor::Position(LatLng::default()), PopupContent::default());
        assert!(map.drain_events().is_empty());
        assert!(map.popup_anchor().is_none());
    }
}
