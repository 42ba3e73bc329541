use crate::map::level::MapProvider;

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_OAUTH_REDIRECT_URL: &str = "http://localhost:3000/auth/callback";
pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

/// Settings read from the environment (and `.env`) once at startup.
///
/// Every key is optional. A missing map key hides that provider, a missing Kakao
/// key additionally disables place search, and missing Supabase settings keep the
/// app on the login page.
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase: Option<SupabaseConfig>,
    pub kakao_rest_key: Option<String>,
    pub naver_client_id: Option<String>,
    pub tile_url: String,
    pub oauth_redirect_url: String,
    pub geolocation_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            _ => None,
        };

        Self {
            supabase,
            kakao_rest_key: get("KAKAO_REST_API_KEY"),
            naver_client_id: get("NAVER_MAP_CLIENT_ID"),
            tile_url: get("MAP_TILE_URL").unwrap_or_else(|| DEFAULT_TILE_URL.to_string()),
            oauth_redirect_url: get("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|| DEFAULT_OAUTH_REDIRECT_URL.to_string()),
            geolocation_url: get("GEOLOCATION_URL")
                .unwrap_or_else(|| DEFAULT_GEOLOCATION_URL.to_string()),
        }
    }

    pub fn provider_enabled(&self, provider: MapProvider) -> bool {
        match provider {
            MapProvider::Kakao => self.kakao_rest_key.is_some(),
            MapProvider::Naver => self.naver_client_id.is_some(),
        }
    }

    pub fn enabled_providers(&self) -> Vec<MapProvider> {
        MapProvider::ALL
            .into_iter()
            .filter(|p| self.provider_enabled(*p))
            .collect()
    }

    pub fn search_enabled(&self) -> bool {
        self.kakao_rest_key.is_some()
    }
}
