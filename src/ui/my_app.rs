use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::auth::{
    restore_session, unix_now, AuthBackend, OAuthProvider, Restored, Session, SignUpOutcome, TokenRefresh,
    REFRESH_MARGIN_SECS,
};
use crate::backend::{SupabaseClient, Unconfigured};
use crate::bookmarks::{BookmarkBackend, Bookmarks};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::i18n::{tr, Locale};
use crate::map::level::MapProvider;
use crate::profile::{Profile, ProfileBackend, ProfileUpdate, Theme};
use crate::routing::{self, Route};
use crate::tasks::Tasks;

use super::auth_pages::{AuthPageAction, AuthRequest, FormMessage, LoginPage, SignupPage};
use super::header::{self, HeaderAction};
use super::map_page::MapPage;
use super::profile_page::ProfilePage;
use super::theme;

/// What survives a restart.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Preferences {
    pub locale: Locale,
    pub theme: Theme,
    pub provider: MapProvider,
    pub session: Option<Session>,
}

enum AppOutcome {
    SignedIn(Result<Session>),
    SignedUp(Result<SignUpOutcome>),
    Restored(Restored),
    Refreshed(Result<Session>),
    SignedOut(Result<()>),
    ProfileLoaded(Result<Option<Profile>>),
    ProfileSaved(ProfileUpdate, Result<()>),
}

pub struct MyApp {
    config: Config,
    prefs: Preferences,
    applied_theme: Option<Theme>,
    route: Route,
    restoring: bool,
    refresh: TokenRefresh,
    auth: Arc<dyn AuthBackend>,
    profiles: Arc<dyn ProfileBackend>,
    tasks: Tasks<AppOutcome>,
    bookmarks: Bookmarks,
    login: LoginPage,
    signup: SignupPage,
    profile: ProfilePage,
    map: Option<MapPage>,
    runtime: tokio::runtime::Runtime,
}

impl eframe::App for MyApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.prefs);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // F11 toggles fullscreen
        if let Some(new_fullscreen) = ctx.input(|i| {
            if i.key_pressed(egui::Key::F11) { Some(!i.viewport().fullscreen.unwrap_or(false)) }
            else                       { None                                            }
        }) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(new_fullscreen));
            ctx.send_viewport_cmd(egui::ViewportCommand::Decorations(!new_fullscreen));
        }

        if self.applied_theme != Some(self.prefs.theme) {
            theme::apply(ctx, self.prefs.theme);
            self.applied_theme = Some(self.prefs.theme);
        }

        for outcome in self.tasks.drain() {
            self.on_outcome(outcome);
        }
        self.keep_token_fresh(ctx);
        let bookmark_changes = self.bookmarks.poll();

        let signed_in = self.prefs.session.is_some();
        let route = routing::resolve(self.route, signed_in, self.restoring);
        if route != self.route {
            log::debug!("redirecting {} -> {}", self.route.path(), route.path());
            self.route = route;
        }
        let locale = self.prefs.locale;

        let header_action = egui::TopBottomPanel::top("header")
            .show(ctx, |ui| header::show(ui, locale, self.prefs.theme, self.route, signed_in))
            .inner;
        if let Some(action) = header_action {
            self.on_header(action);
        }

        if self.restoring {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| ui.spinner());
            });
            return;
        }

        match self.route {
            Route::Login => {
                let configured = self.config.supabase.is_some();
                let actions = egui::CentralPanel::default()
                    .show(ctx, |ui| self.login.show(ui, locale, configured))
                    .inner;
                self.on_auth_actions(ctx, actions);
            }
            Route::Signup => {
                let configured = self.config.supabase.is_some();
                let actions = egui::CentralPanel::default()
                    .show(ctx, |ui| self.signup.show(ui, locale, configured))
                    .inner;
                self.on_auth_actions(ctx, actions);
            }
            Route::Profile => {
                self.load_profile();
                let providers = self.config.enabled_providers();
                let update = egui::CentralPanel::default()
                    .show(ctx, |ui| self.profile.show(ui, locale, &providers))
                    .inner;
                if let Some(update) = update {
                    self.save_profile(update);
                }
            }
            Route::Map => {
                let config = &self.config;
                let provider = self.prefs.provider;
                let handle = self.runtime.handle().clone();
                let page = self
                    .map
                    .get_or_insert_with(|| MapPage::new(config, provider, handle, ctx.clone()));
                let bookmarks = &mut self.bookmarks;
                egui::CentralPanel::default()
                    .frame(egui::Frame::none())
                    .show(ctx, |ui| page.show(ui, locale, bookmarks, &bookmark_changes));
                self.prefs.provider = page.provider();
            }
        }
    }
}

impl MyApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> std::result::Result<Self, Box<dyn Error + Send + Sync>> {
        let prefs: Preferences = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        theme::install_korean_font(&cc.egui_ctx);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .thread_name("caysonmap-io")
            .thread_stack_size(3 * 1024 * 1024) // 3MB stack size
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        let repaint = cc.egui_ctx.clone();

        let (auth, bookmark_backend, profiles) = match &config.supabase {
            Some(supabase) => {
                let client = Arc::new(SupabaseClient::new(supabase));
                (
                    client.clone() as Arc<dyn AuthBackend>,
                    client.clone() as Arc<dyn BookmarkBackend>,
                    client as Arc<dyn ProfileBackend>,
                )
            }
            None => {
                log::warn!("SUPABASE_URL / SUPABASE_ANON_KEY not set; sign-in is disabled");
                (
                    Arc::new(Unconfigured) as Arc<dyn AuthBackend>,
                    Arc::new(Unconfigured) as Arc<dyn BookmarkBackend>,
                    Arc::new(Unconfigured) as Arc<dyn ProfileBackend>,
                )
            }
        };

        let mut app = Self {
            config,
            applied_theme: None,
            route: Route::Map,
            restoring: false,
            refresh: TokenRefresh::default(),
            auth,
            profiles,
            tasks: Tasks::new(handle.clone()).with_repaint(repaint.clone()),
            bookmarks: Bookmarks::new(bookmark_backend, Tasks::new(handle).with_repaint(repaint)),
            login: LoginPage::default(),
            signup: SignupPage::default(),
            profile: ProfilePage::default(),
            map: None,
            prefs: Preferences {
                session: None,
                ..prefs.clone()
            },
            runtime,
        };
        if let Some(session) = prefs.session {
            app.restore(session);
        }
        Ok(app)
    }

    /// Check a stored session with the server before trusting it.
    fn restore(&mut self, session: Session) {
        self.restoring = true;
        let auth = Arc::clone(&self.auth);
        self.tasks.spawn(async move {
            AppOutcome::Restored(restore_session(auth.as_ref(), session, unix_now()).await)
        });
    }

    /// Refresh ahead of expiry, and wake up in time to do so while idle.
    fn keep_token_fresh(&mut self, ctx: &egui::Context) {
        let Some(session) = self.prefs.session.as_ref() else {
            return;
        };
        let now = unix_now();
        if !self.refresh.start(session, now) {
            if let Some(at) = session.expires_at {
                let due = at.saturating_sub(REFRESH_MARGIN_SECS).saturating_sub(now);
                ctx.request_repaint_after(Duration::from_secs(due.max(1)));
            }
            return;
        }
        let refresh_token = session.refresh_token.clone();
        let auth = Arc::clone(&self.auth);
        self.tasks
            .spawn(async move { AppOutcome::Refreshed(auth.refresh_session(refresh_token).await) });
    }

    fn set_session(&mut self, session: Session) {
        let session = session.stamped(unix_now());
        log::info!("signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
        self.bookmarks.set_session(Some(session.clone()));
        self.prefs.session = Some(session);
        self.login.reset();
        self.signup.reset();
        self.profile.clear();
        self.route = Route::Map;
    }

    /// Same user, new tokens. Keeps the current page and loaded data.
    fn replace_tokens(&mut self, session: Session) {
        if self.prefs.session.is_none() {
            return;
        }
        log::debug!("access token refreshed");
        self.bookmarks.set_session(Some(session.clone()));
        self.prefs.session = Some(session);
    }

    fn clear_session(&mut self) {
        self.prefs.session = None;
        self.refresh.reset();
        self.bookmarks.set_session(None);
        self.profile.clear();
        self.map = None;
        self.route = Route::Login;
    }

    fn on_outcome(&mut self, outcome: AppOutcome) {
        let locale = self.prefs.locale;
        match outcome {
            AppOutcome::SignedIn(Ok(session)) => self.set_session(session),
            AppOutcome::SignedIn(Err(err)) => {
                log::warn!("sign-in failed: {err}");
                self.login.busy = false;
                self.login.message = Some(FormMessage::Error(err.user_message()));
            }
            AppOutcome::SignedUp(Ok(SignUpOutcome::SignedIn(session))) => self.set_session(session),
            AppOutcome::SignedUp(Ok(SignUpOutcome::ConfirmationSent)) => {
                self.signup.busy = false;
                self.signup.message = Some(FormMessage::Info(tr(locale, "auth.checkEmail").to_string()));
            }
            AppOutcome::SignedUp(Err(err)) => {
                log::warn!("sign-up failed: {err}");
                self.signup.busy = false;
                self.signup.message = Some(FormMessage::Error(err.user_message()));
            }
            AppOutcome::Restored(restored) => {
                self.restoring = false;
                match restored {
                    Restored::Valid(session) | Restored::Offline(session) => self.set_session(session),
                    Restored::Rejected(err) => {
                        log::info!("stored session rejected: {err}");
                        self.clear_session();
                    }
                }
            }
            AppOutcome::Refreshed(result) => match self.refresh.finish(result, unix_now()) {
                Ok(Some(session)) => self.replace_tokens(session),
                Ok(None) => {}
                Err(err) => {
                    log::info!("session ended, refresh rejected: {err}");
                    self.clear_session();
                }
            },
            AppOutcome::SignedOut(result) => {
                if let Err(err) = result {
                    log::warn!("remote sign-out failed: {err}");
                }
            }
            AppOutcome::ProfileLoaded(Ok(profile)) => self.profile.loaded(profile, locale),
            AppOutcome::ProfileLoaded(Err(err)) => {
                log::warn!("loading profile failed: {err}");
                self.profile.failed(err.user_message());
            }
            AppOutcome::ProfileSaved(update, Ok(())) => {
                self.prefs.locale = update.language;
                self.prefs.theme = update.theme;
                self.prefs.provider = update.preferred_map;
                if let Some(map) = self.map.as_mut() {
                    map.switch_provider(update.preferred_map);
                }
                self.profile.saved(update, self.prefs.locale);
            }
            AppOutcome::ProfileSaved(_, Err(err)) => {
                log::warn!("saving profile failed: {err}");
                self.profile.failed(err.user_message());
            }
        }
    }

    fn on_header(&mut self, action: HeaderAction) {
        match action {
            HeaderAction::Navigate(route) => self.route = route,
            HeaderAction::ToggleLocale => self.prefs.locale = self.prefs.locale.toggled(),
            HeaderAction::ToggleTheme => self.prefs.theme = header::next_theme(self.prefs.theme),
            HeaderAction::SignOut => {
                if let Some(session) = self.prefs.session.clone() {
                    let auth = Arc::clone(&self.auth);
                    self.tasks
                        .spawn(async move { AppOutcome::SignedOut(auth.sign_out(session).await) });
                }
                self.clear_session();
            }
        }
    }

    fn on_auth_actions(&mut self, ctx: &egui::Context, actions: Vec<AuthPageAction>) {
        for action in actions {
            match action {
                AuthPageAction::Navigate(route) => {
                    self.route = route;
                }
                AuthPageAction::Submit(request) => self.submit_auth(ctx, request),
            }
        }
    }

    fn submit_auth(&mut self, ctx: &egui::Context, request: AuthRequest) {
        let auth = Arc::clone(&self.auth);
        match request {
            AuthRequest::SignIn { email, password } => {
                self.tasks.spawn(async move {
                    AppOutcome::SignedIn(auth.sign_in_with_password(email, password).await)
                });
            }
            AuthRequest::SignUp {
                email,
                password,
                nickname,
            } => {
                self.tasks
                    .spawn(async move { AppOutcome::SignedUp(auth.sign_up(email, password, nickname).await) });
            }
            AuthRequest::OAuth(provider) => self.open_oauth(ctx, provider),
        }
    }

    fn open_oauth(&mut self, ctx: &egui::Context, provider: OAuthProvider) {
        let locale = self.prefs.locale;
        let message = match self.auth.oauth_url(provider, &self.config.oauth_redirect_url) {
            Ok(url) => {
                log::info!("opening {} sign-in in the browser", provider.as_str());
                ctx.open_url(egui::OpenUrl::new_tab(url));
                FormMessage::Info(tr(locale, "auth.browserOpened").to_string())
            }
            Err(err) => FormMessage::Error(err.user_message()),
        };
        match self.route {
            Route::Signup => self.signup.message = Some(message),
            _ => self.login.message = Some(message),
        }
    }

    fn load_profile(&mut self) {
        if !self.profile.needs_load() {
            return;
        }
        let Some(session) = self.prefs.session.clone() else {
            return;
        };
        self.profile.loading = true;
        let profiles = Arc::clone(&self.profiles);
        self.tasks
            .spawn(async move { AppOutcome::ProfileLoaded(profiles.fetch_profile(session).await) });
    }

    fn save_profile(&mut self, update: ProfileUpdate) {
        let Some(session) = self.prefs.session.clone() else {
            self.profile.failed(AppError::NoSession.user_message());
            return;
        };
        let profiles = Arc::clone(&self.profiles);
        self.tasks.spawn(async move {
            let result = profiles.update_profile(session, update.clone()).await;
            AppOutcome::ProfileSaved(update, result)
        });
    }
}
