use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing email")]
    MissingEmail,

    #[error("missing code")]
    MissingCode,

    #[error("missing required fields")]
    MissingFields,

    #[error("unsupported discount type")]
    BadDiscountType,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token")]
    InvalidToken,

    #[error("staff credential rejected")]
    Unauthorized,

    #[error("unknown member")]
    UnknownMember,

    #[error("membership inactive")]
    Inactive,

    #[error("code not found")]
    NotFound,

    #[error("code belongs to {month_key}")]
    WrongMonth { month_key: String },

    #[error("code already redeemed at {redeemed_at}")]
    AlreadyRedeemed { redeemed_at: DateTime<Utc> },

    #[error("till transaction already redeemed this code")]
    DuplicateRedemption,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Stable machine-readable code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingEmail => "missing_email",
            AppError::MissingCode => "missing_code",
            AppError::MissingFields => "missing_fields",
            AppError::BadDiscountType => "bad_discount_type",
            AppError::InvalidBody(_) => "invalid_body",
            AppError::MissingToken => "missing_token",
            AppError::InvalidToken => "invalid_token",
            AppError::Unauthorized => "unauthorized",
            AppError::UnknownMember => "unknown_member",
            AppError::Inactive => "inactive",
            AppError::NotFound => "not_found",
            AppError::WrongMonth { .. } => "wrong_month",
            AppError::AlreadyRedeemed { .. } => "already_redeemed",
            AppError::DuplicateRedemption => "duplicate_redemption",
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::DatabaseError(_)
            | AppError::IdentityUnavailable(_)
            | AppError::InternalError(_) => "server_error",
        }
    }

    /// Diagnostic fields that accompany the code, e.g. the code's real month.
    pub fn details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        match self {
            AppError::WrongMonth { month_key } => {
                details.insert("month_key".into(), json!(month_key));
            }
            AppError::AlreadyRedeemed { redeemed_at } => {
                details.insert("redeemed_at".into(), json!(redeemed_at));
            }
            _ => {}
        }
        details
    }

    /// Body used by the validate endpoint: `{"valid": false, "reason": ...}`.
    pub fn validation_response(&self) -> HttpResponse {
        let mut body = self.details();
        body.insert("valid".into(), json!(false));
        body.insert("reason".into(), json!(self.code()));
        self.log();
        HttpResponse::build(self.status_code()).json(Value::Object(body))
    }

    /// Body used by the redeem endpoint: `{"ok": false, "error": ...}`.
    pub fn redemption_response(&self) -> HttpResponse {
        let mut body = self.details();
        body.insert("ok".into(), json!(false));
        body.insert("error".into(), json!(self.code()));
        self.log();
        HttpResponse::build(self.status_code()).json(Value::Object(body))
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(err) => log::error!("Database error: {err}"),
            AppError::IdentityUnavailable(msg) => log::error!("Identity service error: {msg}"),
            AppError::InternalError(msg) => log::error!("Internal error: {msg}"),
            AppError::InvalidBody(msg) => log::warn!("Invalid request body: {msg}"),
            AppError::InvalidToken | AppError::Unauthorized => {
                log::warn!("Authentication error: {self}")
            }
            _ => {}
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingEmail
            | AppError::MissingCode
            | AppError::MissingFields
            | AppError::BadDiscountType
            | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::InvalidToken | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::UnknownMember | AppError::Inactive => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::WrongMonth { .. }
            | AppError::AlreadyRedeemed { .. }
            | AppError::DuplicateRedemption => StatusCode::CONFLICT,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::DatabaseError(_)
            | AppError::IdentityUnavailable(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        HttpResponse::build(self.status_code()).json(json!({ "error": self.code() }))
    }
}
