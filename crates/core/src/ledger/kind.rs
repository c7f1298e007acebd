//! Transaction kinds and their static classification.
//!
//! Every ledger module declares its kinds together with pairs of disjoint
//! lists (positive/negative, debit/credit) whose union is the module's kind
//! set. All sign and behaviour decisions are read from these tables.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallybook_shared::types::{non_negative_zero, sign_factor};
use thiserror::Error;

/// A ledger module (sub-ledger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Module {
    /// Purchase ledger (suppliers).
    #[serde(rename = "PL")]
    Purchases,
    /// Sales ledger (customers).
    #[serde(rename = "SL")]
    Sales,
    /// Cash book.
    #[serde(rename = "CB")]
    CashBook,
}

impl Module {
    /// All modules.
    pub const ALL: [Self; 3] = [Self::Purchases, Self::Sales, Self::CashBook];

    /// Returns the two letter module code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Purchases => "PL",
            Self::Sales => "SL",
            Self::CashBook => "CB",
        }
    }

    /// Returns the kind table for this module.
    #[must_use]
    pub fn table(self) -> &'static KindTable {
        match self {
            Self::Purchases => &PURCHASES,
            Self::Sales => &SALES,
            Self::CashBook => &CASH_BOOK,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The kind of a transaction header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    // ========== Purchase ledger ==========
    /// Brought forward purchase invoice.
    Pbi,
    /// Brought forward purchase credit note.
    Pbc,
    /// Brought forward purchase payment.
    Pbp,
    /// Brought forward purchase refund.
    Pbr,
    /// Purchase invoice.
    Pi,
    /// Purchase credit note.
    Pc,
    /// Purchase payment.
    Pp,
    /// Purchase refund.
    Pr,

    // ========== Sales ledger ==========
    /// Brought forward sales invoice.
    Sbi,
    /// Brought forward sales credit note.
    Sbc,
    /// Brought forward sales receipt.
    Sbp,
    /// Brought forward sales refund.
    Sbr,
    /// Sales invoice.
    Si,
    /// Sales credit note.
    Sc,
    /// Sales receipt.
    Sp,
    /// Sales refund.
    Sr,

    // ========== Cash book ==========
    /// Brought forward cash book payment.
    Cbp,
    /// Brought forward cash book receipt.
    Cbr,
    /// Cash book payment.
    Cp,
    /// Cash book receipt.
    Cr,
}

impl TransactionKind {
    /// Returns the module this kind belongs to.
    #[must_use]
    pub const fn module(self) -> Module {
        match self {
            Self::Pbi | Self::Pbc | Self::Pbp | Self::Pbr | Self::Pi | Self::Pc | Self::Pp | Self::Pr => {
                Module::Purchases
            }
            Self::Sbi | Self::Sbc | Self::Sbp | Self::Sbr | Self::Si | Self::Sc | Self::Sp | Self::Sr => {
                Module::Sales
            }
            Self::Cbp | Self::Cbr | Self::Cp | Self::Cr => Module::CashBook,
        }
    }

    /// Returns the short kind code, e.g. `pi`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pbi => "pbi",
            Self::Pbc => "pbc",
            Self::Pbp => "pbp",
            Self::Pbr => "pbr",
            Self::Pi => "pi",
            Self::Pc => "pc",
            Self::Pp => "pp",
            Self::Pr => "pr",
            Self::Sbi => "sbi",
            Self::Sbc => "sbc",
            Self::Sbp => "sbp",
            Self::Sbr => "sbr",
            Self::Si => "si",
            Self::Sc => "sc",
            Self::Sp => "sp",
            Self::Sr => "sr",
            Self::Cbp => "cbp",
            Self::Cbr => "cbr",
            Self::Cp => "cp",
            Self::Cr => "cr",
        }
    }

    /// Classifies this kind using its module's table.
    #[must_use]
    pub fn classify(self) -> Classification {
        let table = self.module().table();
        Classification {
            is_positive: table.positives.contains(&self),
            is_debit: table.debits.contains(&self),
            is_payment: table.payments.contains(&self),
            requires_lines: table.lines.contains(&self),
            requires_analysis: table.analysis.contains(&self),
        }
    }

    /// Converts an entered (presentation) amount into its stored sign.
    ///
    /// Negative kinds store negative values.
    #[must_use]
    pub fn signed(self, entered: Decimal) -> Decimal {
        entered * sign_factor(self.classify().is_positive)
    }

    /// Converts a stored amount back into its presentation value.
    ///
    /// Never renders `-0`.
    #[must_use]
    pub fn ui_value(self, stored: Decimal) -> Decimal {
        non_negative_zero(stored * sign_factor(self.classify().is_positive))
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a kind code is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown transaction kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .iter()
            .flat_map(|m| m.table().kinds.iter().copied())
            .find(|k| k.code() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Static behaviour attributes of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Stored `total` is positive for this kind.
    pub is_positive: bool,
    /// The kind is a debit from the module's perspective.
    pub is_debit: bool,
    /// Cash moves (payment, receipt, refund).
    pub is_payment: bool,
    /// Header carries lines.
    pub requires_lines: bool,
    /// Lines carry accounts and vat codes and generate postings.
    pub requires_analysis: bool,
}

impl Classification {
    /// The posting sign factor: `+1` when positivity and debit side agree.
    #[must_use]
    pub fn sign(&self) -> Decimal {
        sign_factor(self.is_positive == self.is_debit)
    }
}

/// Malformed kind table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    /// A kind appears in both lists of a pair.
    #[error("{module}: kind {kind} is both {first} and {second}")]
    Overlap {
        /// Module whose table is malformed.
        module: Module,
        /// Offending kind.
        kind: TransactionKind,
        /// Name of the first list.
        first: &'static str,
        /// Name of the second list.
        second: &'static str,
    },

    /// A kind of the module is in neither list of a pair.
    #[error("{module}: kind {kind} is neither {first} nor {second}")]
    Uncovered {
        /// Module whose table is malformed.
        module: Module,
        /// Offending kind.
        kind: TransactionKind,
        /// Name of the first list.
        first: &'static str,
        /// Name of the second list.
        second: &'static str,
    },

    /// A list names a kind from another module.
    #[error("{module}: kind {kind} belongs to another module")]
    Foreign {
        /// Module whose table is malformed.
        module: Module,
        /// Offending kind.
        kind: TransactionKind,
    },
}

/// Per-module kind declarations.
#[derive(Debug)]
pub struct KindTable {
    /// Module the table describes.
    pub module: Module,
    /// Every kind of the module.
    pub kinds: &'static [TransactionKind],
    /// Kinds stored with a positive total.
    pub positives: &'static [TransactionKind],
    /// Kinds stored with a negative total.
    pub negatives: &'static [TransactionKind],
    /// Debit kinds.
    pub debits: &'static [TransactionKind],
    /// Credit kinds.
    pub credits: &'static [TransactionKind],
    /// Payment kinds.
    pub payments: &'static [TransactionKind],
    /// Kinds that carry lines.
    pub lines: &'static [TransactionKind],
    /// Kinds whose lines generate postings.
    pub analysis: &'static [TransactionKind],
}

impl KindTable {
    /// Checks both list pairs are disjoint and cover the module's kinds.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        self.check_pair(self.positives, "positive", self.negatives, "negative")?;
        self.check_pair(self.debits, "debit", self.credits, "credit")?;
        for list in [self.payments, self.lines, self.analysis] {
            if let Some(kind) = list.iter().find(|k| !self.kinds.contains(k)) {
                return Err(ClassifierError::Foreign {
                    module: self.module,
                    kind: *kind,
                });
            }
        }
        Ok(())
    }

    fn check_pair(
        &self,
        first: &[TransactionKind],
        first_name: &'static str,
        second: &[TransactionKind],
        second_name: &'static str,
    ) -> Result<(), ClassifierError> {
        if let Some(kind) = first.iter().chain(second).find(|k| !self.kinds.contains(k)) {
            return Err(ClassifierError::Foreign {
                module: self.module,
                kind: *kind,
            });
        }
        for kind in self.kinds {
            match (first.contains(kind), second.contains(kind)) {
                (true, true) => {
                    return Err(ClassifierError::Overlap {
                        module: self.module,
                        kind: *kind,
                        first: first_name,
                        second: second_name,
                    });
                }
                (false, false) => {
                    return Err(ClassifierError::Uncovered {
                        module: self.module,
                        kind: *kind,
                        first: first_name,
                        second: second_name,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

use TransactionKind::{
    Cbp, Cbr, Cp, Cr, Pbc, Pbi, Pbp, Pbr, Pc, Pi, Pp, Pr, Sbc, Sbi, Sbp, Sbr, Sc, Si, Sp, Sr,
};

static PURCHASES: KindTable = KindTable {
    module: Module::Purchases,
    kinds: &[Pbi, Pbc, Pbp, Pbr, Pi, Pc, Pp, Pr],
    positives: &[Pbi, Pbr, Pi, Pr],
    negatives: &[Pbc, Pbp, Pc, Pp],
    debits: &[Pbi, Pbr, Pi, Pr],
    credits: &[Pbc, Pbp, Pc, Pp],
    payments: &[Pbp, Pbr, Pp, Pr],
    lines: &[Pbi, Pbc, Pi, Pc],
    analysis: &[Pi, Pc, Pp, Pr],
};

static SALES: KindTable = KindTable {
    module: Module::Sales,
    kinds: &[Sbi, Sbc, Sbp, Sbr, Si, Sc, Sp, Sr],
    positives: &[Sbi, Sbr, Si, Sr],
    negatives: &[Sbc, Sbp, Sc, Sp],
    debits: &[Sbc, Sbp, Sc, Sp],
    credits: &[Sbi, Sbr, Si, Sr],
    payments: &[Sbp, Sbr, Sp, Sr],
    lines: &[Sbi, Sbc, Si, Sc],
    analysis: &[Si, Sc, Sp, Sr],
};

static CASH_BOOK: KindTable = KindTable {
    module: Module::CashBook,
    kinds: &[Cbp, Cbr, Cp, Cr],
    positives: &[Cbr, Cr],
    negatives: &[Cbp, Cp],
    debits: &[Cbp, Cp],
    credits: &[Cbr, Cr],
    payments: &[Cbp, Cbr, Cp, Cr],
    lines: &[Cbp, Cbr, Cp, Cr],
    analysis: &[Cp, Cr],
};
