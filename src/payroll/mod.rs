//! Payroll computation core: policy resolution, period aggregation, the pure
//! calculator and the payslip ledger.

pub mod aggregate;
pub mod calculator;
pub mod error;
pub mod ledger;
pub mod policy;

pub use error::PayrollError;
pub use ledger::{GeneratePayroll, PayslipLedger};
pub use policy::PolicyResolver;
