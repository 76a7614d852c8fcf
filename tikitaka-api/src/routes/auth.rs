/// Identity provider endpoints
///
/// # Endpoints
///
/// - `GET /api/v1/authorize` - Redirect to the provider's authorization page
/// - `GET /api/v1/insta/redirection?code=` - Exchange the authorization code
///   for a long-lived token
/// - `GET /api/v1/refresh-token` - Refresh a long-lived token passed in the
///   `long-access-token` header

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    Json,
};
use serde::Deserialize;
use tikitaka_shared::identity::AccessToken;
use tracing::info;

/// Header carrying the long-lived token on refresh
pub const LONG_ACCESS_TOKEN_HEADER: &str = "long-access-token";

/// Authorization callback query
#[derive(Debug, Deserialize)]
pub struct RedirectionQuery {
    pub code: String,
}

/// Redirects to the provider's authorization page
pub async fn authorize(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.identity.authorize_url())
}

/// Authorization callback
///
/// Exchanges the code for a short-lived token, then trades that for a
/// long-lived one.
///
/// # Errors
///
/// - `400 Bad Request`: Empty code
/// - `502 Bad Gateway`: The provider rejected either exchange
pub async fn redirection(
    State(state): State<AppState>,
    Query(query): Query<RedirectionQuery>,
) -> ApiResult<Json<AccessToken>> {
    let code = query.code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("code must not be empty".to_string()));
    }

    let short = state.identity.exchange_code(code).await?;
    let long = state.identity.exchange_long_lived(&short.access_token).await?;

    info!(expires_in = ?long.expires_in, "Issued long-lived access token");
    Ok(Json(long))
}

/// Refreshes a long-lived token
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AccessToken>> {
    let token = long_access_token(&headers)?;
    let refreshed = state.identity.refresh(token).await?;

    Ok(Json(refreshed))
}

fn long_access_token(headers: &HeaderMap) -> ApiResult<&str> {
    headers
        .get(LONG_ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {} header", LONG_ACCESS_TOKEN_HEADER)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_long_access_token_header() {
        let mut headers = HeaderMap::new();
        assert!(matches!(long_access_token(&headers), Err(ApiError::BadRequest(_))));

        headers.insert(LONG_ACCESS_TOKEN_HEADER, HeaderValue::from_static("  "));
        assert!(long_access_token(&headers).is_err());

        headers.insert(LONG_ACCESS_TOKEN_HEADER, HeaderValue::from_static(" IGQVJ123 "));
        assert_eq!(long_access_token(&headers).unwrap(), "IGQVJ123");
    }
}
