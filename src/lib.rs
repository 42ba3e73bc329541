/// Window title, storage key and header name.
pub const APP_NAME: &str = "CaysonMap";

pub mod auth;
pub mod backend;
pub mod bookmarks;
pub mod config;
pub mod error;
pub mod i18n;
pub mod map;
pub mod maps_api;
pub mod profile;
pub mod routing;
pub mod state;
pub mod tasks;
pub mod ui;
