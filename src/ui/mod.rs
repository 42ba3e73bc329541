pub mod auth_pages;
pub mod control_panel;
pub mod error_boundary;
pub mod header;
pub mod map_page;
pub mod my_app;
pub mod profile_page;
pub mod search_box;
pub mod theme;
