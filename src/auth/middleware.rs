// Session gate for protected routes

use super::SESSION_COOKIE;
use crate::web::AppState;
use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

/// Require a valid session cookie.
///
/// On success the `SessionClaims` are placed in the request extensions.
/// Missing, forged, expired or wrongly-signed tokens all get the same
/// redirect to the login page.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return redirect_to_login(request.uri());
    };

    match state.keys.validate(cookie.value()) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, path = %request.uri().path(), "Rejected session token");
            redirect_to_login(request.uri())
        }
    }
}

fn redirect_to_login(uri: &Uri) -> Response {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Redirect::to(&format!("/login?next={}", urlencoding::encode(target))).into_response()
}
