pub mod adapter;
pub mod bookmark_markers;
pub mod category_markers;
pub mod geo;
pub mod icons;
pub mod level;
pub mod library;
pub mod map_tile;
pub mod tile_map;
pub mod widget;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AdapterEvent, AdapterStatus, MapAdapter};
pub use geo::LatLng;
pub use level::MapProvider;
pub use widget::{MapWidget, PopupAction};
