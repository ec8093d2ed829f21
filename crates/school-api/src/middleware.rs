//! Bearer-token authentication

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use school_core::domain::CallerContext;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed Authorization header".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(ApiError::Unauthorized("Expected a Bearer token".to_string())),
    }
}

/// Rejects the request with 401 unless it carries a valid access token;
/// otherwise exposes the caller to handlers as `Extension<CallerContext>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state.jwt.validate_token(bearer_token(request.headers())?)?;
    let caller = CallerContext::new(claims.user_id()?, claims.tenant()?, claims.roles);

    debug!(user = %caller.user_id, tenant = %caller.tenant_id, "request authenticated");
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
