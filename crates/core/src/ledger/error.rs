//! Ledger error types for validation and state errors.
//!
//! Expected, user-addressable failures are collected as [`Violation`]s and
//! returned together inside [`LedgerError::Validation`] before anything is
//! written. Every other variant aborts the unit of work as well.

use std::fmt;

use rust_decimal::Decimal;
use tallybook_shared::AppError;
use tallybook_shared::types::{HeaderId, LineId};
use thiserror::Error;

use super::kind::TransactionKind;
use crate::fiscal::Period;

/// A single broken validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    // ========== Line Rules ==========
    /// A line with both goods and vat zero.
    #[error("Line {line_no}: Goods and Vat cannot both be zero.")]
    ZeroLine {
        /// Offending line number.
        line_no: u32,
    },

    /// A kind that requires lines has none.
    #[error("Transaction must have at least one line")]
    NoLines,

    /// Lines were supplied for a kind that has none.
    #[error("Transaction kind {kind} does not take lines")]
    LinesNotAllowed {
        /// Header kind.
        kind: TransactionKind,
    },

    /// Analysed line with goods but no account.
    #[error("Line {line_no}: an account is required")]
    MissingAccount {
        /// Offending line number.
        line_no: u32,
    },

    /// Posting payment kind without a bank account.
    #[error("A bank account is required")]
    MissingBankAccount,

    // ========== Matching Rules ==========
    /// Edge from a header to itself.
    #[error("A transaction cannot be matched to itself")]
    SelfMatch,

    /// Counterpart has been voided.
    #[error("Transaction {counterpart} is void and cannot be matched")]
    VoidCounterpart {
        /// Voided header.
        counterpart: HeaderId,
    },

    /// Endpoints belong to different contacts.
    #[error("Transaction {counterpart} belongs to a different contact")]
    ContactMismatch {
        /// Counterpart header.
        counterpart: HeaderId,
    },

    /// Endpoints belong to different ledger modules.
    #[error("Transaction {counterpart} belongs to a different ledger")]
    ModuleMismatch {
        /// Counterpart header.
        counterpart: HeaderId,
    },

    /// Cash book headers cannot be matched.
    #[error("Cash book transaction {header} cannot be matched")]
    NotMatchable {
        /// Cash book header.
        header: HeaderId,
    },

    /// New edge against a header with nothing due.
    #[error("Transaction {counterpart} is not outstanding")]
    NotOutstanding {
        /// Counterpart header.
        counterpart: HeaderId,
    },

    /// The matched header is in a later period than the matching header.
    #[error(
        "Transaction {matched_to} in period {matched_to_period} cannot be matched by a transaction in earlier period {matched_by_period}"
    )]
    PeriodOrder {
        /// Header doing the matching.
        matched_by: HeaderId,
        /// Its period.
        matched_by_period: Period,
        /// Header being matched.
        matched_to: HeaderId,
        /// Its period.
        matched_to_period: Period,
    },

    /// Allocations exceed the subject's own total.
    #[error("total of the transactions you are matching must be between 0 and {total}")]
    SubjectBound {
        /// Subject total.
        total: Decimal,
        /// Paid amount the allocations would produce.
        paid: Decimal,
    },

    /// Allocation exceeds what the counterpart has outstanding.
    #[error("Transaction {counterpart}: value must be between 0 and {headroom}")]
    CounterpartBound {
        /// Counterpart header.
        counterpart: HeaderId,
        /// Requested value.
        value: Decimal,
        /// Counterpart due with this edge removed.
        headroom: Decimal,
    },

    /// The same edge was supplied twice.
    #[error("Transaction {counterpart} is matched more than once")]
    DuplicateMatch {
        /// Counterpart header.
        counterpart: HeaderId,
    },

    /// Contact change attempted while edges exist.
    #[error("Cannot change the contact of a transaction that is matched")]
    ContactChangeWithMatches,
}

/// A non-empty set of violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    /// Wraps collected violations; `None` when there are none.
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self(violations))
        }
    }

    /// Returns the violations.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// Consumes the set, returning the violations.
    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.0
    }

    /// Returns true if any violation matches `predicate`.
    pub fn any(&self, predicate: impl Fn(&Violation) -> bool) -> bool {
        self.0.iter().any(predicate)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl From<Violation> for ValidationErrors {
    fn from(violation: Violation) -> Self {
        Self(vec![violation])
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// One or more validation rules failed; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    // ========== Transaction State Errors ==========
    /// Void requested for a header that is already void.
    #[error("Transaction {0} is already void")]
    AlreadyVoid(HeaderId),

    /// Edit requested for a voided header.
    #[error("Cannot modify voided transaction {0}")]
    CannotModifyVoided(HeaderId),

    /// Kind change across modules or posting behaviours.
    #[error("Cannot change transaction kind from {from} to {to}")]
    KindMismatch {
        /// Stored kind.
        from: TransactionKind,
        /// Requested kind.
        to: TransactionKind,
    },

    /// Header not found.
    #[error("Transaction not found: {0}")]
    HeaderNotFound(HeaderId),

    /// Line not found on the header being edited.
    #[error("Line not found: {0}")]
    LineNotFound(LineId),

    // ========== Integrity Errors ==========
    /// Postings of a header do not sum to zero.
    #[error("Postings for transaction {header} do not balance, sum is {sum}")]
    UnbalancedPostings {
        /// Header whose postings are unbalanced.
        header: HeaderId,
        /// Sum of posting values.
        sum: Decimal,
    },

    // ========== Store Errors ==========
    /// Record store error.
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the stable error code reported to callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::AlreadyVoid(_) => "ALREADY_VOID",
            Self::CannotModifyVoided(_) => "CANNOT_MODIFY_VOIDED",
            Self::KindMismatch { .. } => "KIND_MISMATCH",
            Self::HeaderNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::LineNotFound(_) => "LINE_NOT_FOUND",
            Self::UnbalancedPostings { .. } => "UNBALANCED_POSTINGS",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this is a collected validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns the violations when this is a validation failure.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation(errors) => errors.violations(),
            _ => &[],
        }
    }
}

impl From<ValidationErrors> for LedgerError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::Validation(errors) => Self::Validation(errors.to_string()),
            LedgerError::HeaderNotFound(_) | LedgerError::LineNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            LedgerError::AlreadyVoid(_) | LedgerError::CannotModifyVoided(_) => {
                Self::Conflict(err.to_string())
            }
            LedgerError::KindMismatch { .. } => Self::BusinessRule(err.to_string()),
            LedgerError::Store(msg) => Self::Store(msg.clone()),
            LedgerError::UnbalancedPostings { .. } | LedgerError::Internal(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
