//! Common types used across the application.

pub mod amount;
pub mod id;

pub use amount::{non_negative_zero, sign_factor, within_signed_range};
pub use id::*;
