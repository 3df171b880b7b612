use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::ApprovalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OvertimeType {
    Normal,
    Holiday,
    Weekend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvertimeRecord {
    pub id: u64,
    pub employee_id: u64,
    pub company_id: u64,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub overtime_type: String,
    pub status: ApprovalStatus,
}
