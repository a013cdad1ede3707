use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::error::{ApiError, Context};
use crate::AppState;

pub const SESSION_COOKIE: &str = "session_token";

/// The owner of the request's session. Extracting it fails with 401 when the
/// request carries no token or the token is unknown or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

/// Bearer token from the `Authorization` header, else the session cookie.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => req
            .cookie(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty()),
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = session_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let (Some(token), Some(state)) = (token, state) else {
                return Err(ApiError::Unauthorized);
            };
            match state.store.session_user(&token).await.context("SESSION")? {
                Some(id) => Ok(AuthenticatedUser { id }),
                None => Err(ApiError::Unauthorized),
            }
        })
    }
}
