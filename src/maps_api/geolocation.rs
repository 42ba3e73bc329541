use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::map::geo::LatLng;

/// Approximate current position from an IP geolocation endpoint.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon")]
    longitude: Option<f64>,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub async fn locate(&self) -> Result<LatLng> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api("geolocation", status.as_u16(), status.to_string()));
        }
        parse_location(&response.text().await?)
    }
}

fn parse_location(body: &str) -> Result<LatLng> {
    let parsed: LocationResponse = serde_json::from_str(body)?;
    match (parsed.latitude, parsed.longitude) {
        (Some(lat), Some(lng)) => Ok(LatLng::new(lat, lng)),
        _ => Err(AppError::api("geolocation", 200, "no coordinates in response")),
    }
}
