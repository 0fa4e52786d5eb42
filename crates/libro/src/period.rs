//! Academic periods (semesters) and the calendar that assigns dates to them.

use core::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use astral_core::DomainError;

/// A school term, displayed as `2025-S1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Period {
    pub year: i32,
    pub term: u8,
}

impl Period {
    pub fn new(year: i32, term: u8) -> Result<Self, DomainError> {
        if !(1..=2).contains(&term) {
            return Err(DomainError::validation(format!("term must be 1 or 2, got {term}")));
        }
        Ok(Self { year, term })
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-S{}", self.year, self.term)
    }
}

impl FromStr for Period {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("invalid period '{s}' (expected YYYY-S1 or YYYY-S2)"));
        let (year, term) = s.trim().split_once("-S").ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let term = term.parse::<u8>().map_err(|_| invalid())?;
        Period::new(year, term)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Period {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Splits the school year into two semesters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AcademicCalendar {
    second_term_start_month: u32,
}

impl AcademicCalendar {
    pub fn new(second_term_start_month: u32) -> Result<Self, DomainError> {
        if !(2..=12).contains(&second_term_start_month) {
            return Err(DomainError::validation(format!(
                "second term start month must be within 2..=12, got {second_term_start_month}"
            )));
        }
        Ok(Self {
            second_term_start_month,
        })
    }

    pub fn period_of(&self, date: NaiveDate) -> Period {
        let term = if date.month() < self.second_term_start_month { 1 } else { 2 };
        Period {
            year: date.year(),
            term,
        }
    }
}

impl Default for AcademicCalendar {
    /// Second semester starts after the July winter break.
    fn default() -> Self {
        Self {
            second_term_start_month: 7,
        }
    }
}
