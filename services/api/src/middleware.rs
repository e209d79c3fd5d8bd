//! Authentication middleware for session token validation
//!
//! The token is read from the `token` cookie set at login, or from an
//! `Authorization: Bearer` header for non-browser clients.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;
use uuid::Uuid;

use crate::{config::ServerConfig, error::ApiError, state::AppState};

/// Name of the session cookie
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| bearer.map(|TypedHeader(auth)| auth.token().to_string()))
        .ok_or(ApiError::Unauthenticated)?;

    let claims = state.jwt_service.validate_token(&token)?;

    // A token may outlive its user
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    debug!("Authenticated user {}", user.id);

    req.extensions_mut().insert(AuthUser { id: user.id });

    Ok(next.run(req).await)
}

/// Session cookie carrying a freshly issued token
pub fn session_cookie(token: String, config: &ServerConfig) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(same_site(config))
        .max_age(time::Duration::days(config.cookie_expiry_days))
        .build()
}

/// Cookie overwriting the session cookie with an expired, empty one
pub fn cleared_session_cookie(config: &ServerConfig) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(same_site(config))
        .max_age(time::Duration::ZERO)
        .build()
}

// Browsers drop `SameSite=None` cookies that are not `Secure`
fn same_site(config: &ServerConfig) -> SameSite {
    if config.cookie_secure {
        SameSite::None
    } else {
        SameSite::Lax
    }
}
