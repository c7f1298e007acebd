//! Sub-ledger posting and matching.
//!
//! This module implements the core ledger functionality:
//! - Transaction kinds and their sign classification
//! - Headers, lines, postings, VAT and cash book records
//! - Posting of analysed lines and two-leg payments
//! - Matching of outstanding balances between headers
//! - Voiding
//! - Validation and the orchestration service

pub mod accounts;
pub mod cashbook;
pub mod error;
pub mod kind;
pub mod matching;
pub mod posting;
pub mod service;
pub mod types;
pub mod validation;
pub mod vat;
pub mod void;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod matching_props;
#[cfg(test)]
mod posting_props;

pub use accounts::{AccountDirectory, ChartOfAccounts, SystemAccounts, resolve_or_default};
pub use cashbook::CashBookEngine;
pub use error::{LedgerError, ValidationErrors, Violation};
pub use kind::{Classification, ClassifierError, KindTable, Module, TransactionKind};
pub use matching::{MatchInput, MatchPlan, MatchRole, MatchingEngine};
pub use posting::{LineEdits, PostingEngine, PostingStrategy, TotalAccount};
pub use service::{
    CreateTransactionInput, EditTransactionInput, HeaderInput, LedgerService, LineInput,
    TransactionResult,
};
pub use types::{
    CashBookEntry, Component, Header, HeaderStatus, Line, MatchEdge, Posting, UiStatus, VatCode,
    VatDirection, VatEntry,
};
pub use validation::{validate_balance, validate_transaction};
pub use vat::VatEngine;
pub use void::{VoidEngine, VoidOutcome};
