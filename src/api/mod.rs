pub mod payroll;
pub mod policy;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::payroll::PayrollError;

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "duplicate_period")]
    pub error: String,
    #[schema(example = "payslip already generated for employee 1001 in 03/2025")]
    pub message: String,
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Validation(_) => StatusCode::BAD_REQUEST,
            PayrollError::DuplicatePeriod { .. } | PayrollError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            PayrollError::NotFound(_) => StatusCode::NOT_FOUND,
            PayrollError::Forbidden(_) => StatusCode::FORBIDDEN,
            PayrollError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            PayrollError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // storage details stay in the logs
        let message = match self {
            PayrollError::Storage(_) => "Storage temporarily unavailable, retry later".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind().to_string(),
            message,
        })
    }
}
