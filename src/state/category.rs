use egui::Color32;
use serde::{Deserialize, Serialize};

/// Marker color for codes outside the table.
pub const DEFAULT_CATEGORY_COLOR: Color32 = Color32::from_rgb(0x6b, 0x72, 0x80);

/// Place category understood by the place search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "FD6")]
    Restaurant,
    #[serde(rename = "CE7")]
    Cafe,
    #[serde(rename = "CS2")]
    ConvenienceStore,
    #[serde(rename = "MT1")]
    Supermarket,
    #[serde(rename = "HP8")]
    Hospital,
    #[serde(rename = "PM9")]
    Pharmacy,
    #[serde(rename = "AC5")]
    Academy,
    #[serde(rename = "SC4")]
    School,
    #[serde(rename = "AD5")]
    Lodging,
    #[serde(rename = "BK9")]
    Bank,
    #[serde(rename = "PS3")]
    Kindergarten,
    #[serde(rename = "PK6")]
    Parking,
    #[serde(rename = "OL7")]
    GasStation,
    #[serde(rename = "SW8")]
    SubwayStation,
    #[serde(rename = "CT1")]
    Culture,
    #[serde(rename = "AG2")]
    RealEstate,
    #[serde(rename = "PO3")]
    PublicOffice,
    #[serde(rename = "AT4")]
    Attraction,
}

impl Category {
    /// Display order of the layer toggles.
    pub const ALL: [Category; 18] = [
        Category::Restaurant,
        Category::Cafe,
        Category::ConvenienceStore,
        Category::Supermarket,
        Category::Hospital,
        Category::Pharmacy,
        Category::Academy,
        Category::School,
        Category::Lodging,
        Category::Bank,
        Category::Kindergarten,
        Category::Parking,
        Category::GasStation,
        Category::SubwayStation,
        Category::Culture,
        Category::RealEstate,
        Category::PublicOffice,
        Category::Attraction,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Restaurant => "FD6",
            Self::Cafe => "CE7",
            Self::ConvenienceStore => "CS2",
            Self::Supermarket => "MT1",
            Self::Hospital => "HP8",
            Self::Pharmacy => "PM9",
            Self::Academy => "AC5",
            Self::School => "SC4",
            Self::Lodging => "AD5",
            Self::Bank => "BK9",
            Self::Kindergarten => "PS3",
            Self::Parking => "PK6",
            Self::GasStation => "OL7",
            Self::SubwayStation => "SW8",
            Self::Culture => "CT1",
            Self::RealEstate => "AG2",
            Self::PublicOffice => "PO3",
            Self::Attraction => "AT4",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn color(self) -> Color32 {
        let [r, g, b] = match self {
            Self::Restaurant => [0xef, 0x44, 0x44],
            Self::Cafe => [0x3b, 0x82, 0xf6],
            Self::ConvenienceStore => [0x63, 0x66, 0xf1],
            Self::Supermarket => [0x0e, 0xa5, 0xe9],
            Self::Hospital => [0x6b, 0x72, 0x80],
            Self::Pharmacy => [0xf4, 0x3f, 0x5e],
            Self::Academy => [0xec, 0x48, 0x99],
            Self::School => [0x22, 0xc5, 0x5e],
            Self::Lodging => [0x02, 0x84, 0xc7],
            Self::Bank => [0x10, 0xb9, 0x81],
            Self::Kindergarten => [0xf4, 0x72, 0xb6],
            Self::Parking => [0x06, 0xb6, 0xd4],
            Self::GasStation => [0x9c, 0xa3, 0xaf],
            Self::SubwayStation => [0x25, 0x63, 0xeb],
            Self::Culture => [0xa8, 0x55, 0xf7],
            Self::RealEstate => [0x84, 0xcc, 0x16],
            Self::PublicOffice => [0x78, 0x71, 0x6c],
            Self::Attraction => [0xf9, 0x73, 0x16],
        };
        Color32::from_rgb(r, g, b)
    }
}

/// Color for a raw category code as returned by the search API.
pub fn color_for_code(code: &str) -> Color32 {
    Category::from_code(code).map_or(DEFAULT_CATEGORY_COLOR, Category::color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_reversible() {
        for category in Category::ALL {
            assert_eq!(Category::from_code(category.code()), Some(category));
        }
    }

    #[test]
    fn unlisted_codes_get_the_default_color() {
        assert_eq!(color_for_code("FD6"), Color32::from_rgb(0xef, 0x44, 0x44));
        assert_eq!(color_for_code("ZZ9"), DEFAULT_CATEGORY_COLOR);
        assert_eq!(color_for_code(""), DEFAULT_CATEGORY_COLOR);
    }

    #[test]
    fn serializes_as_the_service_code() {
        let json = serde_json::to_string(&Category::Cafe).unwrap();
        assert_eq!(json, "\"CE7\"");
    }
}
