use std::collections::HashMap;
use std::sync::Arc;

use egui::{Color32, Vec2};

use crate::state::category::{color_for_code, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconShape {
    Pin,
    Star,
}

/// Drawing description of a marker. The anchor is the point of the icon that
/// sits on the marker's coordinate, measured from the icon's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    pub shape: IconShape,
    pub fill: Color32,
    pub stroke: Color32,
    pub size: Vec2,
    pub anchor: Vec2,
}

impl MarkerIcon {
    pub fn pin(fill: Color32) -> Self {
        Self {
            shape: IconShape::Pin,
            fill,
            stroke: Color32::WHITE,
            size: Vec2::new(28.0, 40.0),
            anchor: Vec2::new(14.0, 40.0),
        }
    }

    pub fn bookmark() -> Self {
        Self {
            shape: IconShape::Star,
            fill: Color32::from_rgb(0xea, 0xb3, 0x08),
            stroke: Color32::WHITE,
            size: Vec2::new(30.0, 30.0),
            anchor: Vec2::new(15.0, 15.0),
        }
    }
}

/// Category icons, built on first use and kept for the owner's lifetime.
#[derive(Default)]
pub struct IconCache {
    icons: HashMap<&'static str, Arc<MarkerIcon>>,
}

impl IconCache {
    pub fn for_category(&mut self, category: Category) -> Arc<MarkerIcon> {
        self.for_code(category.code())
    }

    pub fn for_code(&mut self, code: &'static str) -> Arc<MarkerIcon> {
        self.icons
            .entry(code)
            .or_insert_with(|| Arc::new(MarkerIcon::pin(color_for_code(code))))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
