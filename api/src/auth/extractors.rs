use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use axum_extra::extract::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use crate::auth::{claims::AuthUser, verify_jwt};

/// Implements extraction of `AuthUser` from an incoming request.
///
/// The credential is taken from the `Authorization: Bearer` header, or —
/// for WebSocket clients that cannot set headers — from a `token` query
/// parameter. The JWT is *verified* (signature and expiry), never merely
/// decoded; a connection that fails verification is rejected before it
/// reaches any handler.
///
/// # Errors
/// Returns `401 Unauthorized` if no credential is present or the token is
/// invalid or expired.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
        {
            Ok(TypedHeader(Authorization(bearer))) => bearer.token().to_owned(),
            Err(_) => query_token(parts).ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing or invalid Authorization header",
            ))?,
        };

        let claims =
            verify_jwt(&token).map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthUser(claims))
    }
}

fn query_token(parts: &Parts) -> Option<String> {
    parts
        .uri
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .map(|t| t.to_owned())
}
