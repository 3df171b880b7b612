use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::model::ApprovalStatus;

/// Leave categories that carry a yearly entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LeaveType {
    #[strum(serialize = "casual")]
    Casual,
    #[strum(serialize = "earned", serialize = "annual")]
    Earned,
    #[strum(serialize = "sick")]
    Sick,
    #[strum(serialize = "maternity")]
    Maternity,
    #[strum(serialize = "paternity")]
    Paternity,
}

/// Leave request as read from the store. `leave_type` stays free text: types
/// outside [`LeaveType`] are still real leave and must be counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub id: u64,
    pub employee_id: u64,
    pub company_id: u64,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: Decimal,
    pub status: ApprovalStatus,
}
