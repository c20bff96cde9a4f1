// Recruitment Identifier (year-scoped, human facing, primary key)
//
// Canonical grammar:
//   "HR" SP YEAR "/" NUMBER
//   YEAR   = 4 ASCII digits, 1000..=9999
//   NUMBER = ASCII digits, no leading zero, >= 1, fits in u32
//
// This module is the only place that formats or decomposes the textual
// form. Everything else treats RecruitmentId as an opaque value.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "HR ";

/// Smallest calendar year representable with four digits.
pub const MIN_YEAR: i32 = 1000;
/// Largest calendar year representable with four digits.
pub const MAX_YEAR: i32 = 9999;

/// Recruitment identifier, textual form `HR <year>/<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecruitmentId {
    year: i32,
    number: u32,
}

impl RecruitmentId {
    /// Mint a new id. Only the sequence allocator hands these out.
    pub(crate) fn new(year: i32, number: u32) -> Result<Self, DomainError> {
        validate_year(year)?;
        if number == 0 {
            return Err(DomainError::MalformedRecruitmentId(format!(
                "{}{}/0",
                PREFIX, year
            )));
        }
        Ok(Self { year, number })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

/// Check that `year` can be written as a four digit calendar year.
pub fn validate_year(year: i32) -> Result<(), DomainError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(DomainError::YearOutOfRange(year))
    }
}

impl fmt::Display for RecruitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", PREFIX, self.year, self.number)
    }
}

impl FromStr for RecruitmentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DomainError::MalformedRecruitmentId(s.to_string());

        let rest = s.strip_prefix(PREFIX).ok_or_else(malformed)?;
        let (year_str, number_str) = rest.split_once('/').ok_or_else(malformed)?;

        if year_str.len() != 4 || !is_ascii_digits(year_str) || year_str.starts_with('0') {
            return Err(malformed());
        }
        if !is_ascii_digits(number_str) || number_str.starts_with('0') {
            return Err(malformed());
        }

        let year: i32 = year_str.parse().map_err(|_| malformed())?;
        let number: u32 = number_str.parse().map_err(|_| malformed())?;

        Self::new(year, number).map_err(|_| malformed())
    }
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl TryFrom<String> for RecruitmentId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecruitmentId> for String {
    fn from(id: RecruitmentId) -> Self {
        id.to_string()
    }
}
