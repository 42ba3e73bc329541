//! Korean/English UI strings.

use serde::{Deserialize, Serialize};

use crate::state::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ko,
    En,
}

impl Locale {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ko => Self::En,
            Self::En => Self::Ko,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "ko" => Some(Self::Ko),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

/// Look up `key`. Unknown keys come back unchanged so a missing entry shows up
/// on screen instead of disappearing.
pub fn tr(locale: Locale, key: &str) -> &str {
    lookup(locale, key).unwrap_or(key)
}

fn lookup(locale: Locale, key: &str) -> Option<&'static str> {
    let (ko, en) = match key {
        "common.appName" => (crate::APP_NAME, crate::APP_NAME),
        "common.save" => ("저장", "Save"),
        "common.logout" => ("로그아웃", "Log out"),
        "common.loading" => ("불러오는 중...", "Loading..."),
        "nav.map" => ("지도", "Map"),
        "nav.profile" => ("프로필", "Profile"),

        "auth.login" => ("로그인", "Log in"),
        "auth.signup" => ("회원가입", "Sign up"),
        "auth.email" => ("이메일", "Email"),
        "auth.password" => ("비밀번호", "Password"),
        "auth.confirmPassword" => ("비밀번호 확인", "Confirm password"),
        "auth.nickname" => ("닉네임", "Nickname"),
        "auth.loginWithEmail" => ("이메일로 로그인", "Log in with email"),
        "auth.signupWithEmail" => ("이메일로 가입", "Sign up with email"),
        "auth.loginWithGoogle" => ("Google로 로그인", "Continue with Google"),
        "auth.loginWithKakao" => ("카카오로 로그인", "Continue with Kakao"),
        "auth.noAccount" => ("계정이 없으신가요?", "Don't have an account?"),
        "auth.haveAccount" => ("이미 계정이 있으신가요?", "Already have an account?"),
        "auth.invalidEmail" => ("올바른 이메일을 입력하세요", "Enter a valid email address"),
        "auth.passwordTooShort" => ("비밀번호는 6자 이상이어야 합니다", "Password must be at least 6 characters"),
        "auth.passwordMismatch" => ("비밀번호가 일치하지 않습니다", "Passwords do not match"),
        "auth.checkEmail" => ("이메일을 확인해 가입을 완료하세요", "Check your email to finish signing up"),
        "auth.browserOpened" => ("브라우저에서 로그인을 계속하세요", "Continue signing in in your browser"),
        "auth.notConfigured" => ("인증 서버가 설정되지 않았습니다", "The auth service is not configured"),

        "map.searchPlaceholder" => ("장소, 주소 검색", "Search places or addresses"),
        "map.noResults" => ("검색 결과가 없습니다", "No results"),
        "map.searching" => ("검색 중...", "Searching..."),
        "map.searchDisabled" => ("장소 검색을 사용할 수 없습니다", "Place search is unavailable"),
        "map.currentLocation" => ("내 위치", "My location"),
        "map.radius" => ("반경", "Radius"),
        "map.layers" => ("레이어", "Layers"),
        "map.mapType" => ("지도", "Map"),
        "map.openInNaver" => ("네이버 지도에서 열기", "Open in Naver Map"),
        "map.bookmarks" => ("즐겨찾기", "Bookmarks"),
        "map.addBookmark" => ("즐겨찾기 추가", "Add to bookmarks"),
        "map.removeBookmark" => ("즐겨찾기 삭제", "Remove bookmark"),
        "map.bookmarkHere" => ("이 위치 즐겨찾기", "Bookmark this spot"),
        "map.droppedPin" => ("선택한 위치", "Dropped pin"),
        "map.loading" => ("지도 로딩 중...", "Loading map..."),
        "map.loadFailed" => ("지도 로딩 실패", "Map failed to load"),
        "map.renderFailed" => ("지도 로딩 중 오류가 발생했습니다", "Something went wrong while drawing the map"),
        "map.retry" => ("다시 시도", "Try again"),
        "map.noProvider" => ("사용 가능한 지도가 없습니다", "No map provider is configured"),

        "profile.title" => ("프로필", "Profile"),
        "profile.email" => ("이메일", "Email"),
        "profile.nickname" => ("닉네임", "Nickname"),
        "profile.theme" => ("테마", "Theme"),
        "profile.light" => ("라이트", "Light"),
        "profile.dark" => ("다크", "Dark"),
        "profile.system" => ("시스템", "System"),
        "profile.language" => ("언어", "Language"),
        "profile.korean" => ("한국어", "Korean"),
        "profile.english" => ("영어", "English"),
        "profile.preferredMap" => ("기본 지도", "Preferred map"),
        "profile.saveSuccess" => ("저장되었습니다", "Saved"),
        "profile.notFound" => ("프로필을 찾을 수 없습니다", "Profile not found"),

        "categories.FD6" => ("음식점", "Restaurants"),
        "categories.CE7" => ("카페", "Cafes"),
        "categories.CS2" => ("편의점", "Convenience stores"),
        "categories.MT1" => ("대형마트", "Supermarkets"),
        "categories.HP8" => ("병원", "Hospitals"),
        "categories.PM9" => ("약국", "Pharmacies"),
        "categories.AC5" => ("학원", "Academies"),
        "categories.SC4" => ("학교", "Schools"),
        "categories.AD5" => ("숙박", "Lodging"),
        "categories.BK9" => ("은행", "Banks"),
        "categories.PS3" => ("어린이집", "Kindergartens"),
        "categories.PK6" => ("주차장", "Parking"),
        "categories.OL7" => ("주유소", "Gas stations"),
        "categories.SW8" => ("지하철역", "Subway stations"),
        "categories.CT1" => ("문화시설", "Culture"),
        "categories.AG2" => ("중개업소", "Real estate"),
        "categories.PO3" => ("공공기관", "Public offices"),
        "categories.AT4" => ("관광명소", "Attractions"),
        _ => return None,
    };
    Some(match locale {
        Locale::Ko => ko,
        Locale::En => en,
    })
}

pub fn category_label(locale: Locale, category: Category) -> &'static str {
    lookup(locale, &format!("categories.{}", category.code())).unwrap_or_else(|| category.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_label_in_both_languages() {
        for category in Category::ALL {
            for locale in [Locale::Ko, Locale::En] {
                assert_ne!(category_label(locale, category), category.code());
            }
        }
    }

    #[test]
    fn unknown_keys_fall_through() {
        assert_eq!(tr(Locale::En, "map.nope"), "map.nope");
        assert_eq!(tr(Locale::Ko, "common.save"), "저장");
    }

    #[test]
    fn locale_codes() {
        assert_eq!(Locale::from_code("en"), Some(Locale::En));
        assert_eq!(Locale::from_code("fr"), None);
        assert_eq!(Locale::Ko.toggled(), Locale::En);
        assert_eq!(serde_json::to_string(&Locale::Ko).unwrap(), "\"ko\"");
    }
}
