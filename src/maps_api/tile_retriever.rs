use crate::error::{AppError, Result};
use crate::map::map_tile::MapTile;

const USER_AGENT: &str = concat!("caysonmap/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

/// Fetches raster tiles from an XYZ tile server.
#[derive(Debug, Clone)]
pub struct TileRetriever {
    client: reqwest::Client,
    url_template: String,
}

impl TileRetriever {
    /// `url_template` contains `{z}`, `{x}` and `{y}` placeholders.
    pub fn new(url_template: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    pub fn tile_url(&self, key: TileKey) -> String {
        self.url_template
            .replace("{z}", &key.z.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }

    /// Fetch a tile and decode it to RGBA.
    pub async fn fetch_tile(&self, key: TileKey) -> Result<MapTile> {
        let url = self.tile_url(key);
        log::trace!("fetching tile {url}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api("tile server", status.as_u16(), status.to_string()));
        }
        let bytes = response.bytes().await?;

        let image = image::load_from_memory(&bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(MapTile::new(
            key,
            [width as usize, height as usize],
            image.into_raw(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_template_is_filled_in() {
        let retriever = TileRetriever::new("https://tiles.example/{z}/{x}/{y}.png").unwrap();
        let url = retriever.tile_url(TileKey { z: 12, x: 3493, y: 1587 });
        assert_eq!(url, "https://tiles.example/12/3493/1587.png");
    }
}
