//! Accounting period management.

pub mod period;

pub use period::{PERIODS_PER_YEAR, Period, PeriodError};
