pub mod advance_salary;
pub mod attendance;
pub mod leave_request;
pub mod overtime;
pub mod payslip;
pub mod policy;
pub mod role;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Approval state shared by leave and overtime requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}
