use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::{ApplicationStatus, DomainError};
use super::store::{Entity, StoreError};

/// Business outcomes of award operations. Everything except `Internal` is an
/// expected, recoverable result the caller can act on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AwardError {
    #[error("student is not eligible: {0}")]
    NotEligible(String),
    #[error("an award has already been granted for this semester")]
    AlreadyAwarded,
    #[error("department budget {available} cannot cover {required}")]
    InsufficientBudget { required: u64, available: u64 },
    #[error("student already has a pending application")]
    DuplicatePending,
    #[error("an application for this semester was previously rejected")]
    PreviouslyRejected,
    #[error("GPA {gpa:.2} does not meet the {minimum:.2} minimum for the requested tier")]
    TierNotEligible { gpa: f64, minimum: f64 },
    #[error("student has not completed a semester yet")]
    NoCompletedSemester,
    #[error("record belongs to another department")]
    WrongDepartment,
    #[error("application is already {}", .0.label())]
    ApplicationClosed(ApplicationStatus),
    #[error("access denied: {0}")]
    Forbidden(&'static str),
    #[error("{} not found", .0.label())]
    NotFound(Entity),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(StoreError),
}

impl AwardError {
    /// Stable machine-readable tag for API payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            AwardError::NotEligible(_) => "not_eligible",
            AwardError::AlreadyAwarded => "already_awarded",
            AwardError::InsufficientBudget { .. } => "insufficient_budget",
            AwardError::DuplicatePending => "duplicate_pending",
            AwardError::PreviouslyRejected => "previously_rejected",
            AwardError::TierNotEligible { .. } => "tier_not_eligible",
            AwardError::NoCompletedSemester => "no_completed_semester",
            AwardError::WrongDepartment => "wrong_department",
            AwardError::ApplicationClosed(_) => "application_closed",
            AwardError::Forbidden(_) => "forbidden",
            AwardError::NotFound(_) => "not_found",
            AwardError::InvalidInput(_) => "invalid_input",
            AwardError::Internal(_) => "internal",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            AwardError::NotFound(_) => StatusCode::NOT_FOUND,
            AwardError::Forbidden(_) | AwardError::WrongDepartment => StatusCode::FORBIDDEN,
            AwardError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AwardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::CONFLICT,
        }
    }
}

impl From<StoreError> for AwardError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateAward => AwardError::AlreadyAwarded,
            StoreError::PendingApplicationExists => AwardError::DuplicatePending,
            StoreError::NotFound(entity) => AwardError::NotFound(entity),
            StoreError::InvalidRecord(message) => AwardError::InvalidInput(message),
            other => AwardError::Internal(other),
        }
    }
}

impl From<DomainError> for AwardError {
    fn from(value: DomainError) -> Self {
        AwardError::InvalidInput(value.to_string())
    }
}

impl IntoResponse for AwardError {
    fn into_response(self) -> Response {
        let message = match &self {
            AwardError::Internal(source) => {
                tracing::error!(error = %source, "award operation failed in record store");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "error": self.code(), "message": message }));
        (self.status_code(), body).into_response()
    }
}
