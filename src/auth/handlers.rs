// Login / logout handlers

use super::{AuthError, INVALID_CREDENTIALS, SESSION_COOKIE};
use crate::db::find_user_by_username;
use crate::web::AppState;
use axum::{
    extract::{rejection::FormRejection, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{debug, error, info};

/// Shown when the login body cannot be decoded
pub const INVALID_FORM: &str = "Invalid form data";

const LOGIN_TEMPLATE: &str = include_str!("../../web/login.html");

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /login
pub async fn login_form(Query(query): Query<NextQuery>) -> Html<String> {
    render_login(None, query.next.as_deref())
}

/// POST /login
///
/// Success sets the session cookie and redirects (303) to `next`.
/// Any credential failure re-renders the form with status 200.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let next = query.next.as_deref();

    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected login form");
            return render_login(Some(INVALID_FORM), next).into_response();
        }
    };

    let username = form.username.trim().to_string();

    match authenticate(&state, &username, form.password).await {
        Ok(()) => {}
        Err(AuthError::InvalidCredentials) => {
            info!(username = %username, "Failed login attempt");
            return render_login(Some(INVALID_CREDENTIALS), next).into_response();
        }
        Err(e) => return e.into_response(),
    }

    let token = match state.keys.issue(&username) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    info!(username = %username, "User signed in");
    let jar = jar.add(session_cookie(token, state.secure_cookies));
    (jar, Redirect::to(safe_next(next))).into_response()
}

/// GET /logout
///
/// Always sends a removal cookie. A token issued earlier stays valid until
/// it expires; there is no server-side session to revoke.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();

    (jar.add(cookie), Redirect::to("/login"))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Look up the user and check the password off the async executor.
///
/// Unknown users and store failures are verified against a placeholder hash
/// and end in the same `InvalidCredentials` as a wrong password.
async fn authenticate(state: &AppState, username: &str, password: String) -> Result<(), AuthError> {
    let stored_hash = {
        let conn = state
            .db
            .lock()
            .map_err(|_| AuthError::Internal("database lock poisoned".to_string()))?;

        match find_user_by_username(&conn, username) {
            Ok(user) => user.map(|u| u.password_hash),
            Err(e) => {
                error!(error = %e, "User lookup failed");
                None
            }
        }
    };

    let hasher = state.passwords.clone();
    let matched = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => hasher.verify(&hash, &password),
        None => hasher.verify_dummy(&password),
    })
    .await
    .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))?;

    if matched {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Only same-site absolute paths are followed; anything else goes to `/`.
/// The path must also fit in a `Location` header (visible ASCII and space).
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && path.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) =>
        {
            path
        }
        _ => "/",
    }
}

pub fn render_login(error: Option<&str>, next: Option<&str>) -> Html<String> {
    let action = match next {
        Some(next) => format!("/login?next={}", urlencoding::encode(next)),
        None => "/login".to_string(),
    };
    let error = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, msg))
        .unwrap_or_default();

    Html(
        LOGIN_TEMPLATE
            .replace("{{action}}", &action)
            .replace("{{error}}", &error),
    )
}
