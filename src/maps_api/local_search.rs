//! Kakao Local place search.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::map::geo::LatLng;
use crate::state::Category;

pub const KAKAO_API_BASE: &str = "https://dapi.kakao.com";

/// Largest page the service returns.
const MAX_PAGE_SIZE: usize = 15;

/// A place as returned by the search service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceResult {
    pub id: String,
    pub place_name: String,
    pub category_name: String,
    pub category_group_code: String,
    pub category_group_name: String,
    pub phone: String,
    pub address_name: String,
    pub road_address_name: String,
    /// Longitude, as a decimal string.
    pub x: String,
    /// Latitude, as a decimal string.
    pub y: String,
    pub place_url: String,
    pub distance: String,
}

impl PlaceResult {
    pub fn position(&self) -> Option<LatLng> {
        LatLng::from_xy(&self.x, &self.y)
    }

    /// Road address when there is one, otherwise the lot address.
    pub fn display_address(&self) -> &str {
        if self.road_address_name.is_empty() {
            &self.address_name
        } else {
            &self.road_address_name
        }
    }

    pub fn phone(&self) -> Option<&str> {
        let phone = self.phone.trim();
        (!phone.is_empty()).then_some(phone)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchMeta {
    pub total_count: u32,
    pub pageable_count: u32,
    pub is_end: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    documents: Vec<PlaceResult>,
    #[serde(default)]
    meta: SearchMeta,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default, alias = "msg")]
    message: String,
}

/// Outcome of a successful call, mirroring the SDK's status codes.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    Ok { places: Vec<PlaceResult>, meta: SearchMeta },
    ZeroResult,
}

impl SearchStatus {
    fn from_response(response: SearchResponse) -> Self {
        if response.documents.is_empty() {
            Self::ZeroResult
        } else {
            Self::Ok {
                places: response.documents,
                meta: response.meta,
            }
        }
    }

    pub fn into_places(self) -> Vec<PlaceResult> {
        match self {
            Self::Ok { places, .. } => places,
            Self::ZeroResult => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Distance,
    Accuracy,
}

impl SortBy {
    fn as_param(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Accuracy => "accuracy",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySearch {
    pub category: Category,
    pub origin: LatLng,
    pub radius: u32,
    pub sort: SortBy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSearch {
    pub query: String,
    pub size: usize,
}

/// Place search as the map layer needs it.
pub trait PlaceSearch: Send + Sync {
    fn category_search(&self, request: CategorySearch) -> BoxFuture<'_, Result<SearchStatus>>;
    fn keyword_search(&self, request: KeywordSearch) -> BoxFuture<'_, Result<SearchStatus>>;
}

#[derive(Debug, Clone)]
pub struct KakaoLocalClient {
    client: reqwest::Client,
    rest_key: String,
    base_url: String,
}

impl KakaoLocalClient {
    pub fn new(rest_key: impl Into<String>) -> Self {
        Self::with_base_url(rest_key, KAKAO_API_BASE)
    }

    pub fn with_base_url(rest_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rest_key: rest_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<SearchStatus> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(reqwest::header::AUTHORIZATION, format!("KakaoAK {}", self.rest_key))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(AppError::api("kakao", status.as_u16(), message));
        }
        let parsed: SearchResponse = serde_json::from_str(&body)?;
        Ok(SearchStatus::from_response(parsed))
    }

    pub async fn search_category(&self, request: CategorySearch) -> Result<SearchStatus> {
        log::debug!(
            "category search {} r={} at {:.5},{:.5}",
            request.category.code(),
            request.radius,
            request.origin.lat,
            request.origin.lng
        );
        let query = category_query(&request);
        self.get("/v2/local/search/category.json", &query).await
    }

    pub async fn search_keyword(&self, request: KeywordSearch) -> Result<SearchStatus> {
        log::debug!("keyword search {:?}", request.query);
        let query = vec![
            ("query", request.query.trim().to_string()),
            ("size", request.size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        self.get("/v2/local/search/keyword.json", &query).await
    }
}

fn category_query(request: &CategorySearch) -> Vec<(&'static str, String)> {
    vec![
        ("category_group_code", request.category.code().to_string()),
        ("x", request.origin.lng.to_string()),
        ("y", request.origin.lat.to_string()),
        ("radius", request.radius.to_string()),
        ("sort", request.sort.as_param().to_string()),
    ]
}

impl PlaceSearch for KakaoLocalClient {
    fn category_search(&self, request: CategorySearch) -> BoxFuture<'_, Result<SearchStatus>> {
        Box::pin(self.search_category(request))
    }

    fn keyword_search(&self, request: KeywordSearch) -> BoxFuture<'_, Result<SearchStatus>> {
        Box::pin(self.search_keyword(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "documents": [{
            "id": "8125786",
            "place_name": "강남역 2호선",
            "category_name": "교통,수송 > 지하철,전철 > 수도권2호선",
            "category_group_code": "SW8",
            "category_group_name": "지하철역",
            "phone": "02-6110-2221",
            "address_name": "서울 강남구 역삼동 858",
            "road_address_name": "서울 강남구 강남대로 지하 396",
            "x": "127.02800140627488",
            "y": "37.49808633653005",
            "place_url": "http://place.map.kakao.com/21160803",
            "distance": ""
        }],
        "meta": { "total_count": 1, "pageable_count": 1, "is_end": true }
    }"#;

    #[test]
    fn decodes_documents() {
        let parsed: SearchResponse = serde_json::from_str(BODY).unwrap();
        let status = SearchStatus::from_response(parsed);
        let SearchStatus::Ok { places, meta } = status else {
            panic!("expected results");
        };
        assert!(meta.is_end);
        let place = &places[0];
        assert_eq!(place.display_address(), "서울 강남구 강남대로 지하 396");
        assert_eq!(place.phone(), Some("02-6110-2221"));
        let pos = place.position().unwrap();
        assert!((pos.lat - 37.498).abs() < 1e-3);
    }

    #[test]
    fn empty_documents_is_zero_result() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"documents": []}"#).unwrap();
        assert_eq!(SearchStatus::from_response(parsed), SearchStatus::ZeroResult);
    }

    #[test]
    fn missing_fields_default() {
        let place: PlaceResult = serde_json::from_str(r#"{"place_name": "x", "address_name": "a"}"#).unwrap();
        assert_eq!(place.display_address(), "a");
        assert_eq!(place.phone(), None);
        assert!(place.position().is_none());
    }

    #[test]
    fn category_query_is_nearest_first() {
        let query = category_query(&CategorySearch {
            category: Category::Restaurant,
            origin: LatLng::new(37.5, 127.0),
            radius: 1000,
            sort: SortBy::Distance,
        });
        assert!(query.contains(&("category_group_code", "FD6".to_string())));
        assert!(query.contains(&("x", "127".to_string())));
        assert!(query.contains(&("y", "37.5".to_string())));
        assert!(query.contains(&("sort", "distance".to_string())));
    }
}
