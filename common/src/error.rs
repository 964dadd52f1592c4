use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Gateway error: {0}")]
    Gateway(String),

    // === APPLICATION ERRORS ===
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Gateway(error.to_string())
    }
}

impl AppError {
    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg })
            } else {
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        match self {
            // === CONVERSION ERRORS ===
            AppError::Storage(error) => {
                log::error!("Storage error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::Gateway(error) => {
                log::error!("Gateway error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }

            // === APPLICATION ERRORS ===
            AppError::Unauthenticated(_) => {
                HttpResponse::Unauthorized().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::NotFound(_) => {
                HttpResponse::NotFound().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::InvalidSession(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::BadRequest(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": self.to_string() }))
            }

            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn invalid_session_maps_to_bad_request() {
        let resp = AppError::InvalidSession("session token mismatch".to_string())
            .to_http_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_and_unauthenticated_keep_their_codes() {
        let resp = AppError::NotFound("unknown user".to_string()).to_http_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::Unauthenticated("no token".to_string()).to_http_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn storage_and_gateway_are_internal() {
        let resp = AppError::Storage(sqlx::Error::PoolClosed).to_http_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = AppError::Gateway("payment link call failed".to_string()).to_http_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
