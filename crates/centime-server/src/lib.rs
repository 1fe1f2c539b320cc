//! Centime Web Server
//!
//! Axum-based REST API for the Centime personal finance application.
//!
//! Identity comes from the `X-User-Id` header: user management lives in
//! front of this service, and the header carries the opaque user id it
//! resolved. With authentication disabled (local development) missing
//! headers fall back to a fixed dev identity.
//!
//! Security posture:
//! - Restrictive CORS policy
//! - Input validation (upload size ceiling, extension allow-list)
//! - Sanitized error responses (internal details only reach the log)

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use centime_core::db::Database;
use centime_core::import::MAX_IMPORT_BYTES;

mod handlers;

/// Maximum multipart upload size: the file ceiling plus room for the
/// other form fields
pub const MAX_UPLOAD_SIZE: usize = MAX_IMPORT_BYTES + 16 * 1024;

/// Maximum pagination limit for list endpoints
pub const MAX_PAGE_LIMIT: i64 = 200;

/// Header carrying the opaque user id resolved by the outer auth layer
const USER_ID_HEADER: &str = "x-user-id";

/// Identity used when authentication is disabled and no header is sent
const LOCAL_DEV_USER: &str = "local-dev";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether a user identity header is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// Resolve the caller's user id from the request headers
pub(crate) fn get_user_id(headers: &HeaderMap, config: &ServerConfig) -> Result<String, AppError> {
    let header_user = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match header_user {
        Some(user) => Ok(user.to_string()),
        None if !config.require_auth => Ok(LOCAL_DEV_USER.to_string()),
        None => Err(AppError::unauthorized("Missing user identity")),
    }
}

/// Build the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let api_routes = Router::new()
        // Accounts
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        // Imports
        .route(
            "/imports",
            get(handlers::list_imports).post(handlers::upload_import),
        )
        .route("/imports/:id", get(handlers::get_import))
        .route(
            "/imports/:id/transactions",
            get(handlers::list_import_transactions),
        )
        // Review
        .route(
            "/imports/transactions/:id",
            patch(handlers::update_staged_category),
        )
        .route("/imports/validate", post(handlers::validate_staged))
        .route("/imports/reject", post(handlers::reject_staged));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::HeaderName::from_static(USER_ID_HEADER),
            ])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::HeaderName::from_static(USER_ID_HEADER),
            ])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("Authentication disabled - do not expose to network!");
    }

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn payload_too_large(msg: &str) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unprocessable(msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.to_string(),
            internal: None,
        }
    }
}

/// Map core errors onto the HTTP taxonomy
impl From<centime_core::Error> for AppError {
    fn from(err: centime_core::Error) -> Self {
        use centime_core::Error;
        match err {
            Error::UnrecognizedFormat(msg) => Self::unprocessable(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::InvalidData(msg) => Self::bad_request(&msg),
            Error::Import(msg) if msg.starts_with("File too large") => {
                Self::payload_too_large(&msg)
            }
            Error::Import(msg) => Self::bad_request(&msg),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(other.into()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}
