//! Scenario file format.
//!
//! Headers, contacts and accounts are referred to by name; lines of an
//! existing header by their line number.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tallybook_core::fiscal::Period;
use tallybook_core::ledger::{MatchRole, TransactionKind, VatCode, VatDirection};

/// A scenario: the chart of accounts and the steps to replay.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Account names added to the chart; the suspense account always exists.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Steps in replay order.
    pub steps: Vec<Step>,
}

/// One operation against the ledger.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Create a header under a new alias.
    Create {
        /// Alias for the new header.
        alias: String,
        /// Header fields.
        header: HeaderSpec,
        /// Lines.
        #[serde(default)]
        lines: Vec<LineSpec>,
        /// Matches with the new header as subject.
        #[serde(default)]
        matches: Vec<MatchSpec>,
    },
    /// Edit an existing header.
    Edit {
        /// Header alias.
        alias: String,
        /// Replacement header fields.
        header: HeaderSpec,
        /// Line changes.
        #[serde(default)]
        lines: Vec<LineSpec>,
        /// Match changes.
        #[serde(default)]
        matches: Vec<MatchSpec>,
    },
    /// Change matches only.
    Match {
        /// Subject alias.
        alias: String,
        /// Match changes.
        matches: Vec<MatchSpec>,
    },
    /// Void a header.
    Void {
        /// Header alias.
        alias: String,
    },
}

impl Step {
    /// Alias of the header the step acts on.
    pub fn alias(&self) -> &str {
        match self {
            Self::Create { alias, .. }
            | Self::Edit { alias, .. }
            | Self::Match { alias, .. }
            | Self::Void { alias } => alias,
        }
    }

    /// Action name, as written in the scenario.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Edit { .. } => "edit",
            Self::Match { .. } => "match",
            Self::Void { .. } => "void",
        }
    }
}

/// Header fields with named contact and bank account.
#[derive(Debug, Deserialize)]
pub struct HeaderSpec {
    /// Transaction kind code.
    pub kind: TransactionKind,
    /// Contact name.
    pub contact: String,
    /// Reference.
    #[serde(default)]
    pub reference: String,
    /// Transaction date.
    pub date: NaiveDate,
    /// Due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Period as `YYYYPP`.
    pub period: Period,
    /// Entered total for kinds without lines.
    #[serde(default)]
    pub total: Decimal,
    /// Bank account name.
    #[serde(default)]
    pub bank_account: Option<String>,
    /// VAT direction for cash book headers.
    #[serde(default)]
    pub vat_direction: Option<VatDirection>,
}

/// A line; `line_no` refers to an existing line of the header being edited.
#[derive(Debug, Deserialize)]
pub struct LineSpec {
    /// Existing line number.
    #[serde(default)]
    pub line_no: Option<u32>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Entered goods.
    #[serde(default)]
    pub goods: Decimal,
    /// Entered vat.
    #[serde(default)]
    pub vat: Decimal,
    /// Nominal account name.
    #[serde(default)]
    pub account: Option<String>,
    /// VAT code.
    #[serde(default)]
    pub vat_code: Option<VatCode>,
    /// Remove the line.
    #[serde(default)]
    pub deleted: bool,
}

/// A match against a named header.
#[derive(Debug, Deserialize)]
pub struct MatchSpec {
    /// Counterpart alias.
    pub counterpart: String,
    /// Subject role.
    #[serde(default)]
    pub role: MatchRole,
    /// Edge value.
    pub value: Decimal,
}
