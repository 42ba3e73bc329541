//! Conversion between the app's zoom and each provider's native level.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const ZOOM_MIN: i32 = 1;
pub const ZOOM_MAX: i32 = 21;
/// Deepest zoom raster tile servers publish.
pub const MAX_TILE_ZOOM: u32 = 19;

/// Kakao counts levels downward: 1 is the closest view.
const KAKAO_LEVEL_MIN: i32 = 1;
const KAKAO_LEVEL_MAX: i32 = 14;
const KAKAO_LEVEL_BASE: i32 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapProvider {
    #[default]
    Kakao,
    Naver,
}

impl MapProvider {
    pub const ALL: [MapProvider; 2] = [MapProvider::Kakao, MapProvider::Naver];

    pub fn zoom_to_level(self, zoom: i32) -> i32 {
        match self {
            Self::Kakao => (KAKAO_LEVEL_BASE - zoom).clamp(KAKAO_LEVEL_MIN, KAKAO_LEVEL_MAX),
            Self::Naver => zoom.clamp(ZOOM_MIN, ZOOM_MAX),
        }
    }

    pub fn level_to_zoom(self, level: i32) -> i32 {
        match self {
            Self::Kakao => (KAKAO_LEVEL_BASE - level).clamp(ZOOM_MIN, ZOOM_MAX),
            Self::Naver => level.clamp(ZOOM_MIN, ZOOM_MAX),
        }
    }

    /// Range of native levels the widget accepts.
    pub fn level_range(self) -> (i32, i32) {
        match self {
            Self::Kakao => (KAKAO_LEVEL_MIN, KAKAO_LEVEL_MAX),
            Self::Naver => (ZOOM_MIN, ZOOM_MAX),
        }
    }

    /// One scroll notch "in" moves the native level by this much.
    pub fn zoom_in_step(self) -> i32 {
        match self {
            Self::Kakao => -1,
            Self::Naver => 1,
        }
    }

    /// Web Mercator display zoom for a native level. Past [`MAX_TILE_ZOOM`]
    /// the widget scales the deepest tiles up.
    pub fn tile_zoom(self, level: i32) -> f64 {
        match self {
            Self::Kakao => (KAKAO_LEVEL_BASE - level) as f64,
            Self::Naver => level as f64,
        }
        .clamp(0.0, ZOOM_MAX as f64)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Kakao => "kakao",
            Self::Naver => "naver",
        }
    }
}

impl fmt::Display for MapProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Kakao => "Kakao",
            Self::Naver => "Naver",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kakao_levels_round_trip() {
        let kakao = MapProvider::Kakao;
        for level in 1..=14 {
            assert_eq!(kakao.zoom_to_level(kakao.level_to_zoom(level)), level);
        }
    }

    #[test]
    fn kakao_zoom_round_trips_inside_the_level_window() {
        let kakao = MapProvider::Kakao;
        for zoom in 7..=20 {
            assert_eq!(kakao.level_to_zoom(kakao.zoom_to_level(zoom)), zoom);
        }
    }

    #[test]
    fn kakao_clamps_instead_of_wrapping() {
        let kakao = MapProvider::Kakao;
        assert_eq!(kakao.zoom_to_level(21), 1);
        assert_eq!(kakao.zoom_to_level(40), 1);
        assert_eq!(kakao.zoom_to_level(1), 14);
        assert_eq!(kakao.zoom_to_level(-5), 14);
        assert_eq!(kakao.level_to_zoom(0), 21);
        assert_eq!(kakao.level_to_zoom(30), 1);
    }

    #[test]
    fn every_level_draws_at_its_own_scale() {
        for provider in MapProvider::ALL {
            let (min, max) = provider.level_range();
            let mut zooms: Vec<f64> = (min..=max).map(|level| provider.tile_zoom(level)).collect();
            zooms.dedup();
            assert_eq!(zooms.len(), (max - min + 1) as usize, "{provider}");
        }
        assert_eq!(MapProvider::Kakao.tile_zoom(1), 20.0);
        assert_eq!(MapProvider::Naver.tile_zoom(21), 21.0);
    }

    #[test]
    fn naver_is_direct() {
        let naver = MapProvider::Naver;
        assert_eq!(naver.zoom_to_level(13), 13);
        assert_eq!(naver.level_to_zoom(13), 13);
        assert_eq!(naver.zoom_to_level(0), ZOOM_MIN);
    }
}
