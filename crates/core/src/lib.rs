//! Core business logic for Tallybook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, posting rules, matching rules and reversals live here.
//!
//! # Modules
//!
//! - `fiscal` - Accounting period keys
//! - `ledger` - Kind classification, posting, VAT, matching and void engines
//! - `store` - Record store port and an in-memory transactional store

pub mod fiscal;
pub mod ledger;
pub mod store;
