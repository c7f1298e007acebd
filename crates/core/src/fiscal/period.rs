//! Accounting period keys.
//!
//! A period is written `YYYYPP` (e.g. `202001` for the first period of the
//! 2020 financial year). Periods are totally ordered, which is all the
//! matching engine needs from the fiscal calendar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of accounting periods in one financial year.
pub const PERIODS_PER_YEAR: u8 = 12;

const MIN_YEAR: u16 = 1;
const MAX_YEAR: u16 = 9999;

/// Errors raised while building or parsing a period.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// Input is not six ASCII digits.
    #[error("Period must be six digits in the form YYYYPP, got {0:?}")]
    Malformed(String),

    /// Period number outside `1..=12`.
    #[error("Period number must be between 1 and {PERIODS_PER_YEAR}, got {0}")]
    PeriodOutOfRange(u8),

    /// Year outside `1..=9999`.
    #[error("Financial year must be between {MIN_YEAR} and {MAX_YEAR}, got {0}")]
    YearOutOfRange(i64),
}

/// An accounting period within a financial year.
///
/// Ordering is chronological: by financial year, then period number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: u16,
    number: u8,
}

impl Period {
    /// Creates a period from its financial year and period number.
    ///
    /// # Errors
    ///
    /// Returns an error if the year or period number is out of range.
    pub fn new(year: u16, number: u8) -> Result<Self, PeriodError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PeriodError::YearOutOfRange(i64::from(year)));
        }
        if !(1..=PERIODS_PER_YEAR).contains(&number) {
            return Err(PeriodError::PeriodOutOfRange(number));
        }
        Ok(Self { year, number })
    }

    /// Returns the financial year this period belongs to.
    #[must_use]
    pub const fn financial_year(self) -> u16 {
        self.year
    }

    /// Returns the 1-based period number within the financial year.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.number
    }

    /// Returns the period `n` periods later, crossing year boundaries.
    ///
    /// Returns `None` if the result falls outside the representable years.
    #[must_use]
    pub fn checked_add(self, n: u32) -> Option<Self> {
        self.offset(i64::from(n))
    }

    /// Returns the period `n` periods earlier, crossing year boundaries.
    #[must_use]
    pub fn checked_sub(self, n: u32) -> Option<Self> {
        self.offset(-i64::from(n))
    }

    fn offset(self, n: i64) -> Option<Self> {
        let per_year = i64::from(PERIODS_PER_YEAR);
        let index = i64::from(self.year) * per_year + i64::from(self.number - 1) + n;
        let year = u16::try_from(index.div_euclid(per_year)).ok()?;
        let number = u8::try_from(index.rem_euclid(per_year) + 1).ok()?;
        Self::new(year, number).ok()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.number)
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PeriodError::Malformed(s.to_string()));
        }
        let year = s[..4]
            .parse::<u16>()
            .map_err(|_| PeriodError::Malformed(s.to_string()))?;
        let number = s[4..]
            .parse::<u8>()
            .map_err(|_| PeriodError::Malformed(s.to_string()))?;
        Self::new(year, number)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}
