//! Theme toggle.
//!
//! The preference is kept in the session. Browsers that send the
//! `Sec-CH-Prefers-Color-Scheme` client hint get the matching theme while
//! the preference is "system".

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::models::session_keys;
use crate::ui::{ThemePreference, ThemeToggleView, UiContext};

/// Client hint carrying the browser's color scheme.
const PREFERS_COLOR_SCHEME: &str = "sec-ch-prefers-color-scheme";

/// Theme toggle button fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/theme_toggle.html")]
pub struct ThemeToggleTemplate {
    pub toggle: ThemeToggleView,
    pub data_theme: &'static str,
}

/// The stored theme preference, `System` if none is stored.
pub async fn current_theme(session: &Session) -> ThemePreference {
    session
        .get::<ThemePreference>(session_keys::THEME)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Whether the request says the browser prefers a dark color scheme.
#[must_use]
pub fn prefers_dark(headers: &HeaderMap) -> bool {
    headers
        .get(PREFERS_COLOR_SCHEME)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_matches('"').eq_ignore_ascii_case("dark"))
}

/// Presentation context for a request.
pub async fn ui_context(session: &Session, headers: &HeaderMap) -> UiContext {
    UiContext::new(current_theme(session).await, prefers_dark(headers))
}

/// Flip the theme and return the updated toggle button (HTMX).
#[instrument(skip(session, headers))]
pub async fn toggle(session: Session, headers: HeaderMap) -> Result<impl IntoResponse> {
    let theme = current_theme(&session).await.toggled();
    session.insert(session_keys::THEME, theme).await?;
    tracing::debug!(%theme, "Theme changed");

    let ui = UiContext::new(theme, prefers_dark(&headers));
    Ok((
        AppendHeaders([("HX-Trigger", "theme-changed")]),
        ThemeToggleTemplate {
            toggle: ui.toggle(),
            data_theme: ui.data_theme(),
        },
    ))
}
