use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Infrastructure failures: database, migrations and startup configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a handler can answer with. Only the status and a short plain-text
/// message reach the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("[{tag}] {source}")]
    Internal {
        tag: &'static str,
        #[source]
        source: Error,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Internal { .. } => {
                log::error!("{}", self);
                HttpResponse::InternalServerError().body("Internal Error")
            }
            _ => HttpResponse::build(self.status_code()).body(self.to_string()),
        }
    }
}

/// Tags a store failure with the handler it happened in.
pub trait Context<T> {
    fn context(self, tag: &'static str) -> std::result::Result<T, ApiError>;
}

impl<T> Context<T> for Result<T> {
    fn context(self, tag: &'static str) -> std::result::Result<T, ApiError> {
        self.map_err(|source| ApiError::Internal { tag, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    fn body_text(response: HttpResponse) -> String {
        let bytes = response.into_body().try_into_bytes().unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn internal_errors_are_opaque() {
        let err: Result<()> = Err(Error::Database(sqlx::Error::PoolTimedOut));
        let api_err = err.context("VEHICLES_GET").unwrap_err();

        assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api_err.to_string().starts_with("[VEHICLES_GET]"));
        assert_eq!(body_text(api_err.error_response()), "Internal Error");
    }

    #[test]
    fn client_errors_carry_their_message() {
        let err = ApiError::NotFound("Vehicle not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(err.error_response()), "Vehicle not found");

        assert_eq!(body_text(ApiError::Unauthorized.error_response()), "Unauthorized");
    }
}
