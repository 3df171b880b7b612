use derive_more::Display;

use crate::model::payslip::PayslipStatus;

/// Failures raised by a store implementation.
#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    /// A uniqueness constraint rejected the write.
    #[display(fmt = "unique key already taken")]
    Duplicate,

    /// An advance read during aggregation was no longer `approved` at commit time.
    #[display(fmt = "expected to settle {} advance(s), settled {}", expected, settled)]
    StaleAdvance { expected: usize, settled: u64 },

    /// A persisted row could not be decoded into its domain type.
    #[display(fmt = "corrupt record: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

#[derive(Debug, Display)]
pub enum PayrollError {
    #[display(fmt = "validation failed: {}", _0)]
    Validation(String),

    #[display(
        fmt = "payslip already generated for employee {} in {:02}/{}",
        employee_id,
        month,
        year
    )]
    DuplicatePeriod {
        employee_id: u64,
        month: u32,
        year: i32,
    },

    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    #[display(fmt = "payslip cannot move from {} to {}", from, to)]
    InvalidTransition {
        from: PayslipStatus,
        to: PayslipStatus,
    },

    #[display(fmt = "forbidden: {}", _0)]
    Forbidden(String),

    #[display(fmt = "storage unavailable: {}", _0)]
    Storage(StoreError),

    #[display(fmt = "invariant violated: {}", _0)]
    InvariantViolation(String),
}

impl PayrollError {
    /// Stable machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PayrollError::Validation(_) => "validation",
            PayrollError::DuplicatePeriod { .. } => "duplicate_period",
            PayrollError::NotFound(_) => "not_found",
            PayrollError::InvalidTransition { .. } => "invalid_transition",
            PayrollError::Forbidden(_) => "forbidden",
            PayrollError::Storage(_) => "storage_failure",
            PayrollError::InvariantViolation(_) => "invariant_violation",
        }
    }
}

impl std::error::Error for PayrollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PayrollError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for PayrollError {
    /// A row that cannot be decoded will not decode on retry either.
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Corrupt(detail) => PayrollError::InvariantViolation(detail),
            other => PayrollError::Storage(other),
        }
    }
}
