pub mod geolocation;
pub mod local_search;
pub mod tile_retriever;
