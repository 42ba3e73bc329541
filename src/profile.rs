use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::error::Result;
use crate::i18n::Locale;
use crate::map::level::MapProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::System];

    pub fn label_key(self) -> &'static str {
        match self {
            Self::Light => "profile.light",
            Self::Dark => "profile.dark",
            Self::System => "profile.system",
        }
    }
}

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub preferred_map: MapProvider,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub language: Locale,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// The columns the profile page may change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub nickname: String,
    pub preferred_map: MapProvider,
    pub theme: Theme,
    pub language: Locale,
}

impl ProfileUpdate {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            nickname: profile.nickname.clone().unwrap_or_default(),
            preferred_map: profile.preferred_map,
            theme: profile.theme,
            language: profile.language,
        }
    }
}

pub trait ProfileBackend: Send + Sync {
    fn fetch_profile(&self, session: Session) -> BoxFuture<'_, Result<Option<Profile>>>;
    fn update_profile(&self, session: Session, update: ProfileUpdate) -> BoxFuture<'_, Result<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_rows_decode_with_defaults() {
        let profile: Profile = serde_json::from_str(r#"{"id": "u-1", "theme": "dark", "language": "en"}"#).unwrap();
        assert_eq!(profile.theme, Theme::Dark);
        assert_eq!(profile.language, Locale::En);
        assert_eq!(profile.preferred_map, MapProvider::Kakao);
        assert_eq!(ProfileUpdate::from_profile(&profile).nickname, "");
    }

    #[test]
    fn update_serializes_lowercase_enums() {
        let update = ProfileUpdate {
            nickname: "casy".to_string(),
            preferred_map: MapProvider::Naver,
            theme: Theme::System,
            language: Locale::Ko,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["preferred_map"], "naver");
        assert_eq!(json["theme"], "system");
        assert_eq!(json["language"], "ko");
    }
}
