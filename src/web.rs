// 🌐 Web Surface - router, shared state, protected pages

use crate::auth::{handlers, middleware::require_session, PasswordHasher, SessionClaims, SessionKeys};
use crate::db::{find_user_by_username, get_expenses_for_user, get_vehicles_for_user, User};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub keys: SessionKeys,
    pub passwords: PasswordHasher,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(conn: Connection, keys: SessionKeys, passwords: PasswordHasher) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            keys,
            passwords,
            secure_cookies: false,
        }
    }

    /// Builder pattern: mark the session cookie Secure
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(index))
        .route("/api/expenses", get(list_expenses))
        .route("/api/vehicles", get(list_vehicles))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET / - Landing page for a signed-in user
async fn index(Extension(claims): Extension<SessionClaims>) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>CarVault</title></head><body>\
         <p>CarVault server is running. Signed in as {}.</p>\
         <p><a href=\"/api/vehicles\">Vehicles</a> | <a href=\"/api/expenses\">Expenses</a> | \
         <a href=\"/logout\">Sign out</a></p>\
         </body></html>",
        escape_html(claims.username())
    ))
}

/// GET /api/expenses - Expenses of the signed-in user
async fn list_expenses(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Response {
    let Ok(conn) = state.db.lock() else {
        error!("Database lock poisoned");
        return internal_error();
    };

    let user = match current_user(&conn, &claims) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match get_expenses_for_user(&conn, user.id) {
        Ok(expenses) => (StatusCode::OK, Json(ApiResponse::ok(expenses))).into_response(),
        Err(e) => {
            error!(error = %e, "Error getting expenses");
            internal_error()
        }
    }
}

/// GET /api/vehicles - Vehicles of the signed-in user
async fn list_vehicles(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Response {
    let Ok(conn) = state.db.lock() else {
        error!("Database lock poisoned");
        return internal_error();
    };

    let user = match current_user(&conn, &claims) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match get_vehicles_for_user(&conn, user.id) {
        Ok(vehicles) => (StatusCode::OK, Json(ApiResponse::ok(vehicles))).into_response(),
        Err(e) => {
            error!(error = %e, "Error getting vehicles");
            internal_error()
        }
    }
}

/// The user named by the session. A valid token for a deleted user is a 404.
fn current_user(conn: &Connection, claims: &SessionClaims) -> Result<User, Response> {
    match find_user_by_username(conn, claims.username()) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(Vec::<()>::new(), "user not found")),
        )
            .into_response()),
        Err(e) => {
            error!(error = %e, "Error looking up user");
            Err(internal_error())
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::err(Vec::<()>::new(), "internal error")),
    )
        .into_response()
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
