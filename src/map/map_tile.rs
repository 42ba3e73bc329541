use crate::maps_api::tile_retriever::TileKey;

/// A decoded raster tile. The GPU texture is created lazily on first paint,
/// since decoding happens off the UI thread where there is no egui context.
pub struct MapTile {
    pub key: TileKey,
    pub size: [usize; 2],
    rgba: Vec<u8>,
    texture: Option<egui::TextureHandle>,
}

impl MapTile {
    pub fn new(key: TileKey, size: [usize; 2], rgba: Vec<u8>) -> Self {
        Self {
            key,
            size,
            rgba,
            texture: None,
        }
    }

    pub fn texture(&mut self, ctx: &egui::Context) -> &egui::TextureHandle {
        let Self {
            key, size, rgba, texture, ..
        } = self;
        texture.get_or_insert_with(|| {
            let image = egui::ColorImage::from_rgba_unmultiplied(*size, rgba);
            ctx.load_texture(
                format!("tile_{}_{}_zoom{}", key.x, key.y, key.z),
                image,
                egui::TextureOptions::LINEAR,
            )
        })
    }
}

impl std::fmt::Debug for MapTile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapTile")
            .field("key", &self.key)
            .field("size", &self.size)
            .field("uploaded", &self.texture.is_some())
            .finish()
    }
}
