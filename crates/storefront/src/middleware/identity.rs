//! Identity extractors.
//!
//! Authentication happens upstream: the auth gateway verifies the session
//! and forwards the caller as `x-user-id` (UUID) and `x-user-role`
//! (`customer` or `admin`, defaulting to `customer`). These extractors turn
//! those headers into a [`CurrentUser`].

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use atelier_core::UserId;

use crate::error::set_sentry_user;
use crate::models::{CurrentUser, Role};

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Error returned when a route's identity requirement is not met.
#[derive(Debug)]
pub enum IdentityRejection {
    /// No usable identity on the request.
    Unauthorized(&'static str),
    /// Identity present but lacking the admin role.
    Forbidden,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

fn current_user(parts: &Parts) -> Result<CurrentUser, IdentityRejection> {
    let id = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or(IdentityRejection::Unauthorized("Authentication required"))?
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<UserId>().ok())
        .ok_or(IdentityRejection::Unauthorized("Invalid user id"))?;

    let role = match parts.headers.get(USER_ROLE_HEADER) {
        None => Role::default(),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|raw| raw.parse::<Role>().ok())
            .ok_or(IdentityRejection::Unauthorized("Invalid user role"))?,
    };

    let user = CurrentUser { id, role };
    set_sentry_user(&user.id);
    Ok(user)
}

/// Extractor that requires an authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).map(Self)
    }
}

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)?;
        if !user.is_admin() {
            return Err(IdentityRejection::Forbidden);
        }
        Ok(Self(user))
    }
}
