use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Giveaway {0} not found")]
    GiveawayNotFound(i64),

    #[error("Giveaway ended at {end_date}")]
    GiveawayExpired { end_date: DateTime<Utc> },

    #[error("Already participated")]
    AlreadyParticipated {
        next_eligible_at: Option<DateTime<Utc>>,
    },

    #[error("Rate limited until {retry_at}")]
    RateLimited { retry_at: DateTime<Utc> },

    #[error("Giveaway {0} has no participants")]
    NoParticipants(i64),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Notification error: {0}")]
    NotificationFailure(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 插入参与记录失败时的翻译：唯一索引冲突 -> AlreadyParticipated，其它保持数据库错误
    pub fn from_participation_insert(err: DbErr) -> Self {
        if is_unique_violation(&err) {
            AppError::AlreadyParticipated {
                next_eligible_at: None,
            }
        } else {
            AppError::DatabaseError(err)
        }
    }

    /// 面向用户的错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::GiveawayNotFound(_) => "GIVEAWAY_NOT_FOUND",
            AppError::GiveawayExpired { .. } => "GIVEAWAY_EXPIRED",
            AppError::AlreadyParticipated { .. } => "ALREADY_PARTICIPATED",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::NoParticipants(_) => "NO_PARTICIPANTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden => "FORBIDDEN",
            AppError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

/// sea-orm 能识别的唯一约束冲突；驱动未映射时退回到错误文本判断
pub fn is_unique_violation(err: &DbErr) -> bool {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return true;
    }
    let text = err.to_string();
    text.contains("UNIQUE constraint failed") || text.contains("duplicate key value")
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, message, extra) = match self {
            AppError::GiveawayNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Giveaway {id} not found"),
                json!(null),
            ),
            AppError::GiveawayExpired { end_date } => (
                StatusCode::BAD_REQUEST,
                format!("This giveaway ended at {}", end_date.to_rfc3339()),
                json!({ "end_date": end_date }),
            ),
            AppError::AlreadyParticipated { next_eligible_at } => match next_eligible_at {
                Some(at) => (
                    StatusCode::CONFLICT,
                    format!("Already participated, next entry allowed at {}", at.to_rfc3339()),
                    json!({ "next_eligible_at": at }),
                ),
                None => (
                    StatusCode::CONFLICT,
                    "You can only enter this giveaway once".to_string(),
                    json!(null),
                ),
            },
            AppError::RateLimited { retry_at } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many entries, retry after {}", retry_at.to_rfc3339()),
                json!({ "retry_at": retry_at }),
            ),
            AppError::NoParticipants(id) => (
                StatusCode::BAD_REQUEST,
                format!("Giveaway {id} has no participants"),
                json!(null),
            ),
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone(), json!(null))
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, msg.clone(), json!(null))
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    StatusCode::UNAUTHORIZED,
                    "Invalid token".to_string(),
                    json!(null),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), json!(null)),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (StatusCode::FORBIDDEN, "Forbidden".to_string(), json!(null))
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone(), json!(null))
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    json!(null),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    json!(null),
                )
            }
        };

        let mut error = json!({
            "code": self.code(),
            "message": message,
        });
        if !extra.is_null() {
            error["details"] = extra;
        }

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": error
        }))
    }
}
