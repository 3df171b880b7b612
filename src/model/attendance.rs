use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Leave,
    HalfDay,
}

impl AttendanceStatus {
    /// Late arrivals still count as a worked day.
    pub fn is_worked(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub company_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub work_hours: Decimal,
}
