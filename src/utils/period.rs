use chrono::{Months, NaiveDate};

use crate::payroll::error::PayrollError;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One payroll cycle: a validated (month, year) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    month: u32,
    year: i32,
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, PayrollError> {
        if !(1..=12).contains(&month) {
            return Err(PayrollError::Validation(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PayrollError::Validation(format!(
                "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
            )));
        }

        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| PayrollError::Validation(format!("invalid period {month}/{year}")))?;
        let last_day = first_day
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| PayrollError::Validation(format!("invalid period {month}/{year}")))?;

        Ok(Self {
            month,
            year,
            first_day,
            last_day,
        })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.first_day,
            end: self.last_day,
        }
    }
}
