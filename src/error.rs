use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum BeamError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("missing configuration: {0}")]
    Config(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("vault error: {0}")]
    Vault(String),

    /// Non-2xx response from the Pinterest API, message taken from the
    /// response body when it carries one.
    #[error("Pinterest API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limit exceeded after {attempts} retries")]
    RateLimitExhausted { attempts: u32 },

    #[error("OAuth2 token request error: {0}")]
    TokenRequest(String),

    #[error("OAuth2 server error: {0}")]
    TokenRejected(String),

    #[error("{0}")]
    OauthFlow(String),
}

impl BeamError {
    /// The create-pin retry loop keys on the rendered error text; the
    /// platform reports throttling both as a bare 429 status and as "429"
    /// embedded in proxied error messages.
    pub fn is_rate_limited(&self) -> bool {
        self.to_string().contains("429")
    }

    /// 401 during publish means the stored token was revoked or expired
    /// beyond refresh; the connection must be deactivated, never retried.
    pub fn is_auth_expired(&self) -> bool {
        self.to_string().contains("401")
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for BeamError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => {
                let message = err
                    .error_description()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| err.error().to_string());
                BeamError::TokenRejected(message)
            }
            RequestTokenError::Request(req_e) => {
                BeamError::TokenRequest(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => BeamError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => BeamError::TokenRequest(s),
        }
    }
}

impl IntoResponse for BeamError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            BeamError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "CONFIG_ERROR".to_string(),
                    message: self.to_string(),
                },
            ),
            BeamError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: self.to_string(),
                },
            ),
            BeamError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: self.to_string(),
                },
            ),
            BeamError::Vault(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "VAULT_ERROR".to_string(),
                    message: "Secret vault is unavailable.".to_string(),
                },
            ),
            BeamError::RateLimitExhausted { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiErrorBody {
                    code: "RATE_LIMIT".to_string(),
                    message: self.to_string(),
                },
            ),
            BeamError::Api { status, ref message } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                let code = match status {
                    StatusCode::TOO_MANY_REQUESTS => "RATE_LIMIT",
                    StatusCode::UNAUTHORIZED => "AUTH_EXPIRED",
                    StatusCode::FORBIDDEN => "FORBIDDEN",
                    StatusCode::NOT_FOUND => "NOT_FOUND",
                    _ => "UPSTREAM_ERROR",
                };
                (
                    status,
                    ApiErrorBody {
                        code: code.to_string(),
                        message: message.clone(),
                    },
                )
            }
            BeamError::OauthFlow(_) | BeamError::TokenRequest(_) | BeamError::TokenRejected(_) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "OAUTH_ERROR".to_string(),
                    message: self.to_string(),
                },
            ),
            BeamError::Http(_) | BeamError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "BAD_GATEWAY".to_string(),
                    message: "Upstream service is unavailable.".to_string(),
                },
            ),
            BeamError::Json(_) | BeamError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                },
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
