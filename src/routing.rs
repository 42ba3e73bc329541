//! Pages and the sign-in guard in front of them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Login,
    Signup,
    Map,
    Profile,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Signup => "/signup",
            Self::Map => "/map",
            Self::Profile => "/profile",
        }
    }

    /// Unknown paths, including `/`, land on the map.
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let matches = |prefix: &str| path == prefix || path.starts_with(&format!("{prefix}/"));
        if matches("/login") {
            Self::Login
        } else if matches("/signup") {
            Self::Signup
        } else if matches("/profile") {
            Self::Profile
        } else {
            Self::Map
        }
    }

    pub fn requires_session(self) -> bool {
        matches!(self, Self::Map | Self::Profile)
    }

    pub fn is_auth_page(self) -> bool {
        matches!(self, Self::Login | Self::Signup)
    }
}

/// Where a navigation to `requested` actually ends up.
///
/// While the session is still being restored, nothing is redirected; the caller
/// shows a loading screen instead.
pub fn resolve(requested: Route, signed_in: bool, restoring: bool) -> Route {
    if restoring {
        return requested;
    }
    match (signed_in, requested.requires_session(), requested.is_auth_page()) {
        (false, true, _) => Route::Login,
        (true, _, true) => Route::Map,
        _ => requested,
    }
}
