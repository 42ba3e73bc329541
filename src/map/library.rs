use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::{AppError, Result};
use crate::maps_api::tile_retriever::{TileKey, TileRetriever};

use super::geo::LatLng;
use super::level::MapProvider;
use super::map_tile::MapTile;
use super::tile_map::{TileMap, TileStore};
use super::widget::MapWidget;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetOptions {
    pub provider: MapProvider,
    pub center: LatLng,
    /// Native level.
    pub level: i32,
}

/// A map library that may not be usable yet when the adapter is created.
///
/// The adapter polls [`is_available`](MapLibrary::is_available) until it reports
/// true, calls [`load`](MapLibrary::load) exactly once, then constructs one widget.
pub trait MapLibrary {
    type Widget: MapWidget;

    fn name(&self) -> &'static str;
    fn is_available(&mut self) -> bool;
    fn load(&mut self) -> Result<()>;
    fn create(&mut self, options: WidgetOptions) -> Result<Self::Widget>;
}

/// Library backed by the built-in tile map. It is available once a first tile
/// has come back from the tile server, and the handshake fails if that fetch did.
pub struct TileMapLibrary {
    retriever: TileRetriever,
    handle: Handle,
    repaint: Option<egui::Context>,
    first_tile: Option<oneshot::Receiver<Result<MapTile>>>,
    outcome: Option<std::result::Result<MapTile, String>>,
}

const FIRST_TILE: TileKey = TileKey { z: 0, x: 0, y: 0 };

impl TileMapLibrary {
    pub fn new(retriever: TileRetriever, handle: Handle, repaint: Option<egui::Context>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let first_retriever = retriever.clone();
        let requester = repaint.clone();
        handle.spawn(async move {
            let result = first_retriever.fetch_tile(FIRST_TILE).await;
            let _ = sender.send(result);
            if let Some(ctx) = requester {
                ctx.request_repaint();
            }
        });
        Self {
            retriever,
            handle,
            repaint,
            first_tile: Some(receiver),
            outcome: None,
        }
    }
}

impl MapLibrary for TileMapLibrary {
    type Widget = TileMap;

    fn name(&self) -> &'static str {
        "tile-map"
    }

    fn is_available(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        let Some(first_tile) = self.first_tile.as_mut() else {
            return false;
        };
        match first_tile.try_recv() {
            Ok(result) => {
                self.outcome = Some(result.map_err(|e| e.user_message()));
                self.first_tile = None;
                true
            }
            Err(oneshot::error::TryRecvError::Empty) => false,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.outcome = Some(Err("first tile fetch was dropped".to_string()));
                self.first_tile = None;
                true
            }
        }
    }

    fn load(&mut self) -> Result<()> {
        match &self.outcome {
            Some(Ok(_)) => Ok(()),
            Some(Err(message)) => Err(AppError::MapInit(message.clone())),
            None => Err(AppError::MapInit("library not available".to_string())),
        }
    }

    fn create(&mut self, options: WidgetOptions) -> Result<TileMap> {
        let mut store = TileStore::new(self.retriever.clone(), self.handle.clone(), self.repaint.clone());
        if let Some(Ok(tile)) = self.outcome.take() {
            store.insert(FIRST_TILE, tile);
        }
        Ok(TileMap::new(options, store))
    }
}
