pub mod auth;
mod config;
pub mod push;
mod routes;
pub mod scheduler;
pub mod timestamp;

use crate::server::auth::AuthCtx;
use crate::storage::{StorageError, Store};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Router,
    http::{Method, StatusCode, header},
    routing::{delete, get, patch, post},
};
pub use config::{AppConfig, ConfigError, MetaEntry, PushConfig, ReminderConfig, meta_items};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

use scheduler::{ReminderScheduler, SchedulerError};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub scheduler: ReminderScheduler,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store, scheduler: ReminderScheduler) -> Self {
        Self {
            config,
            store,
            scheduler,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let private = Router::new()
        .route("/api/user_by_token", get(routes::users::me))
        .route("/api/user/{id}", get(routes::users::get_user))
        .route("/api/team/new", post(routes::teams::create_team))
        .route("/api/team/{id}/users", get(routes::teams::team_users))
        .route(
            "/api/team/{id}",
            patch(routes::teams::update_team).delete(routes::teams::delete_team),
        )
        .route("/api/team/{id}/projects", get(routes::projects::list_projects))
        .route(
            "/api/team/{id}/project/new",
            post(routes::projects::create_project),
        )
        .route(
            "/api/project/{id}",
            patch(routes::projects::update_project).delete(routes::projects::delete_project),
        )
        .route("/api/project/{id}/streams", get(routes::streams::list_streams))
        .route(
            "/api/project/{id}/stream/new",
            post(routes::streams::create_stream),
        )
        .route(
            "/api/project/{id}/tasks",
            get(routes::tasks::list_project_tasks),
        )
        .route(
            "/api/stream/{id}",
            get(routes::streams::get_stream)
                .patch(routes::streams::update_stream)
                .delete(routes::streams::delete_stream),
        )
        .route("/api/stream/{id}/tasks", get(routes::tasks::list_stream_tasks))
        .route("/api/stream/{id}/task/new", post(routes::tasks::create_task))
        .route("/api/stream/{id}/goals", get(routes::goals::list_goals))
        .route("/api/stream/{id}/goal/new", post(routes::goals::create_goal))
        .route("/api/tasks/all", get(routes::tasks::list_all_tasks))
        .route(
            "/api/task/{id}",
            patch(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route(
            "/api/task/{id}/relation",
            post(routes::tasks::create_relation),
        )
        .route("/api/relation/{id}", delete(routes::tasks::delete_relation))
        .route(
            "/api/goal/{id}",
            patch(routes::goals::update_goal).delete(routes::goals::delete_goal),
        )
        .route(
            "/api/tasks/{id}/reminders",
            get(routes::reminders::list_task_reminders).post(routes::reminders::create_reminder),
        )
        .route("/api/reminders", get(routes::reminders::list_my_reminders))
        .route(
            "/api/reminders/{id}",
            patch(routes::reminders::update_reminder).delete(routes::reminders::delete_reminder),
        )
        .route("/api/push/subscribe", post(routes::push::subscribe))
        .route("/api/push/subscriptions", get(routes::push::list_subscriptions))
        .route(
            "/api/push/subscriptions/{id}",
            delete(routes::push::unsubscribe),
        )
        .with_state(state.clone())
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            user_id = tracing::field::Empty
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/register", post(routes::users::register))
        .route("/api/login", post(routes::users::login))
        .route("/api/check-email", post(routes::users::check_email))
        .route("/api/taskStatuses", get(routes::meta::statuses))
        .route("/api/priorities", get(routes::meta::priorities))
        .route("/api/connectionTypes", get(routes::meta::connection_types))
        .route(
            "/api/push/vapid-public-key",
            get(routes::push::vapid_public_key),
        )
        .merge(private)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured
    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );

    // Disable caching for API and health endpoints
    if path == "/healthz" || path.starts_with("/api/") {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
        headers.insert(
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        );
    }

    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    if let Some(auth) = req.extensions().get::<AuthCtx>() {
        Span::current().record("user_id", auth.user_id);
    }
    Ok(next.run(req).await)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    pub(crate) fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    pub(crate) fn unauthorized() -> Self {
        Self::Unauthorized
    }
    pub(crate) fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    pub(crate) fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(m) => AppError::NotFound(m),
            StorageError::Forbidden(m) => AppError::Forbidden(m),
            StorageError::Conflict(m) => AppError::Conflict(m),
            StorageError::InvalidInput(m) => AppError::BadRequest(m),
            other => AppError::internal(other),
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        AppError::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, m, "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m, "conflict", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else if status.is_client_error() {
            tracing::warn!(status = %status, kind = kind, message = %msg, "request rejected");
        }
        let body = axum::Json(ErrorBody { error: msg, kind });
        (status, body).into_response()
    }
}
