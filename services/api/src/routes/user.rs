//! User endpoints
//!
//! One account owns the portfolio. Registration and login hand out a
//! session token both in the response body and as the `token` cookie.

use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::{error, info, warn};

use super::{load, save};
use crate::{
    assets::{AssetBatch, folders},
    error::{ApiError, ApiResult},
    extract::FormPayload,
    middleware::{AuthUser, auth_middleware, cleared_session_cookie, session_cookie},
    models::user::{
        ForgotPasswordRequest, LoginRequest, RESET_TOKEN_TTL_MINUTES, RegisterRequest,
        ResetPasswordRequest, UpdatePasswordRequest, UpdateProfileRequest, User, UserResponse,
        hash_password, hash_reset_token,
    },
    response::Envelope,
    state::AppState,
};

const KIND: &str = "User";

pub fn router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/logout", get(logout))
        .route("/me", get(get_me))
        .route("/me/profile/update", put(update_profile))
        .route("/password/update", put(update_password))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me/portfolio", get(get_portfolio))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/:token", put(reset_password))
        .merge(protected_routes)
}

/// Attach a fresh session to the response
fn with_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
    envelope: Envelope,
) -> ApiResult<(CookieJar, Envelope)> {
    let token = state.jwt_service.generate_token(user.id)?;
    let envelope = envelope
        .with("user", &UserResponse::from(user))?
        .with("token", &token)?
        .with("expiresIn", &state.jwt_service.token_expiry())?;
    Ok((jar.add(session_cookie(token, &state.config)), envelope))
}

/// Register the portfolio owner with avatar and resume
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    form: FormPayload,
) -> ApiResult<(CookieJar, Envelope)> {
    let request = RegisterRequest::from_form(&form)?;
    // The portfolio has a single owner
    if let Some(owner) = state.users.first().await? {
        warn!("Rejected registration while user {} owns the portfolio", owner.id);
        return Err(ApiError::validation(
            "The portfolio owner is already registered. Log in instead.",
        ));
    }
    let password_hash = hash_password(&request.password)?;

    let mut assets = AssetBatch::new(state.storage.as_ref());
    let avatar = assets.upload(request.avatar, folders::AVATARS).await?;
    let resume = assets.upload(request.resume, folders::RESUMES).await?;
    let user = request.into_user(password_hash, avatar, resume);
    assets
        .commit(state.users.insert(&user).await.map_err(ApiError::from))
        .await?;
    info!("Registered user {}", user.id);

    with_session(
        &state,
        jar,
        &user,
        Envelope::created().message("User registered."),
    )
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: FormPayload,
) -> ApiResult<(CookieJar, Envelope)> {
    let request = LoginRequest::from_form(&form)?;
    let user = state
        .users
        .find_one_by("email", &request.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !user.verify_password(&request.password)? {
        warn!("Failed login for user {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }
    info!("User {} logged in", user.id);

    with_session(&state, jar, &user, Envelope::ok().message("Logged in."))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> (CookieJar, Envelope) {
    info!("User {} logged out", auth.id);
    (
        jar.add(cleared_session_cookie(&state.config)),
        Envelope::ok().message("Logged out."),
    )
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Envelope> {
    let user = load(&state.users, auth.id, KIND).await?;
    Envelope::ok().with("user", &UserResponse::from(&user))
}

/// Public profile shown on the portfolio site
pub async fn get_portfolio(State(state): State<AppState>) -> ApiResult<Envelope> {
    let user = state.users.first().await?.ok_or(ApiError::NotFound(KIND))?;
    Envelope::ok().with("user", &UserResponse::from(&user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = UpdateProfileRequest::from_form(&form)?;
    let mut user = load(&state.users, auth.id, KIND).await?;
    request.apply(&mut user);

    let mut assets = AssetBatch::new(state.storage.as_ref());
    assets
        .replace(&mut user.avatar, request.avatar, folders::AVATARS)
        .await?;
    assets
        .replace(&mut user.resume, request.resume, folders::RESUMES)
        .await?;
    assets.commit(save(&state.users, &user, KIND).await).await?;
    info!("Updated profile of user {}", user.id);

    Envelope::ok()
        .message("Profile updated.")
        .with("user", &UserResponse::from(&user))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = UpdatePasswordRequest::from_form(&form)?;
    let mut user = load(&state.users, auth.id, KIND).await?;

    if !user.verify_password(&request.current_password)? {
        return Err(ApiError::validation("Incorrect current password."));
    }
    user.password = hash_password(&request.new_password)?;
    save(&state.users, &user, KIND).await?;
    info!("Updated password of user {}", user.id);

    Ok(Envelope::ok().message("Password updated."))
}

/// Email a password reset link
pub async fn forgot_password(
    State(state): State<AppState>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = ForgotPasswordRequest::from_form(&form)?;
    let mut user = state
        .users
        .find_one_by("email", &request.email)
        .await?
        .ok_or(ApiError::NotFound(KIND))?;

    let token = user.issue_reset_token();
    save(&state.users, &user, KIND).await?;

    let reset_url = format!(
        "{}/password/reset/{}",
        state.config.dashboard_url.trim_end_matches('/'),
        token
    );
    let body = format!(
        "Your reset password link is:\n\n{}\n\nIt expires in {} minutes. \
         If you did not request it, please ignore this email.",
        reset_url, RESET_TOKEN_TTL_MINUTES
    );

    if let Err(e) = state
        .mailer
        .send(&user.email, "Portfolio dashboard password recovery", &body)
        .await
    {
        error!("Failed to send reset email to user {}: {}", user.id, e);
        user.clear_reset_token();
        save(&state.users, &user, KIND).await?;
        return Err(ApiError::Internal(e));
    }
    info!("Sent password reset email to user {}", user.id);

    Ok(Envelope::ok().message(format!("Email sent to {} successfully.", user.email)))
}

/// Set a new password with an emailed token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    jar: CookieJar,
    form: FormPayload,
) -> ApiResult<(CookieJar, Envelope)> {
    let expired = || ApiError::validation("Reset password token is invalid or has been expired.");

    let mut user = state
        .users
        .find_one_by("resetPasswordToken", &hash_reset_token(&token))
        .await?
        .ok_or_else(expired)?;
    if !user.reset_token_active(Utc::now()) {
        return Err(expired());
    }

    let request = ResetPasswordRequest::from_form(&form)?;
    user.password = hash_password(&request.password)?;
    user.clear_reset_token();
    save(&state.users, &user, KIND).await?;
    info!("Reset password of user {}", user.id);

    with_session(&state, jar, &user, Envelope::ok().message("Password reset."))
}
