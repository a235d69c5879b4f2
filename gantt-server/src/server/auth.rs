use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use gantt_shared::jwt::{self, JwtClaims};
use tracing::{error, warn};

use super::{AppError, AppState};

#[derive(Clone, Debug)]
pub struct AuthCtx {
    pub user_id: i32,
    pub claims: JwtClaims,
}

/// Rejects the request with 401 unless it carries a valid bearer token whose
/// subject is an existing user.
pub async fn require_bearer(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let unauthorized = || Err(AppError::unauthorized());
    let header_val = match req.headers().get(header::AUTHORIZATION) {
        Some(v) => v,
        None => return unauthorized(),
    };
    let header_str = header_val.to_str().map_err(|_| AppError::unauthorized())?;
    let Some(token) = header_str.strip_prefix("Bearer ") else {
        return unauthorized();
    };

    let claims = match jwt::decode_and_verify(token, state.config.jwt_secret.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error=%e, "auth: jwt decode failed");
            return unauthorized();
        }
    };
    let user_id = claims.user_id().map_err(|e| {
        warn!(error=%e, "auth: bad subject");
        AppError::unauthorized()
    })?;

    match state.store.user_exists(user_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id, jti = %claims.jti, "auth: token subject no longer exists");
            return unauthorized();
        }
        Err(e) => {
            error!(user_id, error=%e, "auth: user lookup failed");
            return Err(AppError::internal(e));
        }
    }

    req.extensions_mut().insert(AuthCtx { user_id, claims });
    Ok(next.run(req).await)
}

pub fn issue_token(state: &AppState, user_id: i32) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::days(state.config.token_ttl_days)).timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        exp,
    };
    jwt::encode(&claims, state.config.jwt_secret.as_bytes()).map_err(|e| {
        error!(user_id, error=%e, "login/register: jwt encode failed");
        AppError::internal(e)
    })
}
