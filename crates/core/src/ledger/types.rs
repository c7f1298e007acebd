//! Ledger domain types: headers, lines, postings, VAT and cash book entries,
//! and matching edges.
//!
//! Amounts are stored signed. Negative kinds (credit notes, payments and so
//! on) hold negative `goods`, `vat`, `total`, `paid` and `due`.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallybook_shared::types::{
    AccountId, CashBookEntryId, ContactId, HeaderId, LineId, MatchId, PostingId, VatEntryId,
    within_signed_range,
};

use super::kind::{Module, TransactionKind};
use crate::fiscal::Period;

/// Header lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStatus {
    /// Live transaction.
    #[default]
    Cleared,
    /// Reversed; terminal.
    Void,
}

/// Direction of a VAT register entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VatDirection {
    /// VAT reclaimable on purchases.
    Input,
    /// VAT due on sales.
    Output,
}

/// A VAT code and its rate (percent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatCode {
    /// Short code, e.g. `S` for standard rate.
    pub code: String,
    /// Rate in percent.
    pub rate: Decimal,
}

/// Which part of a line a posting carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Net amount against the line's account.
    Goods,
    /// VAT amount against the vat account.
    Vat,
    /// Gross amount against the control (or bank) account.
    Total,
}

impl Component {
    /// All components in posting order.
    pub const ALL: [Self; 3] = [Self::Goods, Self::Vat, Self::Total];
}

/// A transaction header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Unique identifier.
    pub id: HeaderId,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Customer or supplier.
    pub contact_id: ContactId,
    /// Free text reference copied onto every posting.
    pub reference: String,
    /// Net amount.
    pub goods: Decimal,
    /// VAT amount.
    pub vat: Decimal,
    /// Gross amount.
    pub total: Decimal,
    /// Amount allocated by matching.
    pub paid: Decimal,
    /// Outstanding amount, always `total - paid`.
    pub due: Decimal,
    /// Transaction date.
    pub date: NaiveDate,
    /// Date payment falls due.
    pub due_date: Option<NaiveDate>,
    /// Accounting period.
    pub period: Period,
    /// Lifecycle status.
    pub status: HeaderStatus,
    /// Bank account for payment kinds that post.
    pub bank_account: Option<AccountId>,
    /// VAT direction for cash book headers.
    pub vat_direction: Option<VatDirection>,
}

impl Header {
    /// Returns the module of this header's kind.
    #[must_use]
    pub fn module(&self) -> Module {
        self.kind.module()
    }

    /// Returns true if the header has been voided.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.status == HeaderStatus::Void
    }

    /// Checks `due == total - paid` and that `paid` lies between zero and
    /// `total` along the sign of `total`.
    #[must_use]
    pub fn amounts_consistent(&self) -> bool {
        self.due == self.total - self.paid && within_signed_range(self.paid, self.total)
    }

    /// Sets `due` and derives `paid` from it.
    pub fn set_due(&mut self, due: Decimal) {
        self.due = due;
        self.paid = self.total - due;
    }

    /// Total as presented to a user.
    #[must_use]
    pub fn ui_total(&self) -> Decimal {
        self.kind.ui_value(self.total)
    }

    /// Paid as presented to a user.
    #[must_use]
    pub fn ui_paid(&self) -> Decimal {
        self.kind.ui_value(self.paid)
    }

    /// Due as presented to a user.
    #[must_use]
    pub fn ui_due(&self) -> Decimal {
        self.kind.ui_value(self.due)
    }

    /// Returns the presentation status of the header as of `today`.
    #[must_use]
    pub fn ui_status(&self, today: NaiveDate) -> UiStatus {
        if self.module() == Module::CashBook {
            return UiStatus::NotApplicable;
        }
        if self.is_void() {
            return UiStatus::Void;
        }
        if self.due.is_zero() {
            return UiStatus::FullyMatched;
        }
        match self.due_date {
            Some(due_date) if due_date >= today => UiStatus::Outstanding,
            Some(_) => UiStatus::Overdue,
            None => UiStatus::NotFullyMatched,
        }
    }
}

/// Presentation status of a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiStatus {
    /// Header is void.
    Void,
    /// Nothing left to pay.
    FullyMatched,
    /// Balance left, due date not passed.
    Outstanding,
    /// Balance left, due date passed.
    Overdue,
    /// Balance left, no due date.
    NotFullyMatched,
    /// Cash book headers are never matched and carry no status.
    NotApplicable,
}

impl fmt::Display for UiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Void => "void",
            Self::FullyMatched => "fully matched",
            Self::Outstanding => "outstanding",
            Self::Overdue => "overdue",
            Self::NotFullyMatched => "not fully matched",
            Self::NotApplicable => "",
        })
    }
}

/// An analysed transaction line.
///
/// The posting and VAT references are weak: the line remembers which record
/// corresponds to each component but does not own it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Unique identifier.
    pub id: LineId,
    /// Owning header.
    pub header_id: HeaderId,
    /// 1-based dense position.
    pub line_no: u32,
    /// Free text description.
    pub description: String,
    /// Net amount.
    pub goods: Decimal,
    /// VAT amount.
    pub vat: Decimal,
    /// Nominal account for the goods component.
    pub account: Option<AccountId>,
    /// VAT code.
    pub vat_code: Option<VatCode>,
    /// Posting carrying the goods component.
    pub goods_posting: Option<PostingId>,
    /// Posting carrying the vat component.
    pub vat_posting: Option<PostingId>,
    /// Posting carrying the total component.
    pub total_posting: Option<PostingId>,
    /// VAT register entry.
    pub vat_entry: Option<VatEntryId>,
}

impl Line {
    /// Returns the amount of one component.
    #[must_use]
    pub fn component_value(&self, component: Component) -> Decimal {
        match component {
            Component::Goods => self.goods,
            Component::Vat => self.vat,
            Component::Total => self.goods + self.vat,
        }
    }

    /// Returns the posting referenced for `component`.
    #[must_use]
    pub fn posting_ref(&self, component: Component) -> Option<PostingId> {
        match component {
            Component::Goods => self.goods_posting,
            Component::Vat => self.vat_posting,
            Component::Total => self.total_posting,
        }
    }

    /// Sets or clears the posting referenced for `component`.
    pub fn set_posting_ref(&mut self, component: Component, posting: Option<PostingId>) {
        match component {
            Component::Goods => self.goods_posting = posting,
            Component::Vat => self.vat_posting = posting,
            Component::Total => self.total_posting = posting,
        }
    }

    /// Clears every posting and VAT reference.
    pub fn clear_refs(&mut self) {
        self.goods_posting = None;
        self.vat_posting = None;
        self.total_posting = None;
        self.vat_entry = None;
    }

    /// Returns true if neither goods nor vat carry a value.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.goods.is_zero() && self.vat.is_zero()
    }
}

/// A general ledger posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Unique identifier, assigned by the store.
    pub id: PostingId,
    /// Module of the originating header.
    pub module: Module,
    /// Originating header.
    pub header_id: HeaderId,
    /// Originating line, absent for payment legs.
    pub line_id: Option<LineId>,
    /// Line number, or the synthetic leg number for payments.
    pub line_no: u32,
    /// Nominal account.
    pub account: AccountId,
    /// Signed value; positive is a debit.
    pub value: Decimal,
    /// Header reference.
    pub reference: String,
    /// Header period.
    pub period: Period,
    /// Header date.
    pub date: NaiveDate,
    /// Header kind.
    pub kind: TransactionKind,
    /// Line component carried.
    pub component: Component,
}

/// A posting not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosting {
    /// Module of the originating header.
    pub module: Module,
    /// Originating header.
    pub header_id: HeaderId,
    /// Originating line.
    pub line_id: Option<LineId>,
    /// Line number.
    pub line_no: u32,
    /// Nominal account.
    pub account: AccountId,
    /// Signed value.
    pub value: Decimal,
    /// Header reference.
    pub reference: String,
    /// Header period.
    pub period: Period,
    /// Header date.
    pub date: NaiveDate,
    /// Header kind.
    pub kind: TransactionKind,
    /// Line component carried.
    pub component: Component,
}

impl NewPosting {
    /// Attaches the identifier assigned by the store.
    #[must_use]
    pub fn with_id(self, id: PostingId) -> Posting {
        Posting {
            id,
            module: self.module,
            header_id: self.header_id,
            line_id: self.line_id,
            line_no: self.line_no,
            account: self.account,
            value: self.value,
            reference: self.reference,
            period: self.period,
            date: self.date,
            kind: self.kind,
            component: self.component,
        }
    }
}

/// A VAT register entry for one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatEntry {
    /// Unique identifier, assigned by the store.
    pub id: VatEntryId,
    /// Module of the originating header.
    pub module: Module,
    /// Originating header.
    pub header_id: HeaderId,
    /// Originating line.
    pub line_id: LineId,
    /// Line number.
    pub line_no: u32,
    /// VAT code.
    pub vat_code: String,
    /// VAT rate.
    pub vat_rate: Decimal,
    /// Line goods.
    pub goods: Decimal,
    /// Line vat.
    pub vat: Decimal,
    /// Header reference.
    pub reference: String,
    /// Header period.
    pub period: Period,
    /// Header date.
    pub date: NaiveDate,
    /// Header kind.
    pub kind: TransactionKind,
    /// Input or output vat.
    pub direction: VatDirection,
}

/// A VAT entry not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVatEntry {
    /// Module of the originating header.
    pub module: Module,
    /// Originating header.
    pub header_id: HeaderId,
    /// Originating line.
    pub line_id: LineId,
    /// Line number.
    pub line_no: u32,
    /// VAT code.
    pub vat_code: String,
    /// VAT rate.
    pub vat_rate: Decimal,
    /// Line goods.
    pub goods: Decimal,
    /// Line vat.
    pub vat: Decimal,
    /// Header reference.
    pub reference: String,
    /// Header period.
    pub period: Period,
    /// Header date.
    pub date: NaiveDate,
    /// Header kind.
    pub kind: TransactionKind,
    /// Input or output vat.
    pub direction: VatDirection,
}

impl NewVatEntry {
    /// Attaches the identifier assigned by the store.
    #[must_use]
    pub fn with_id(self, id: VatEntryId) -> VatEntry {
        VatEntry {
            id,
            module: self.module,
            header_id: self.header_id,
            line_id: self.line_id,
            line_no: self.line_no,
            vat_code: self.vat_code,
            vat_rate: self.vat_rate,
            goods: self.goods,
            vat: self.vat,
            reference: self.reference,
            period: self.period,
            date: self.date,
            kind: self.kind,
            direction: self.direction,
        }
    }
}

/// A cash book entry mirroring the bank side of a payment header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBookEntry {
    /// Unique identifier.
    pub id: CashBookEntryId,
    /// Originating header.
    pub header_id: HeaderId,
    /// Bank account.
    pub account: AccountId,
    /// Signed value; positive is money in.
    pub value: Decimal,
    /// Header reference.
    pub reference: String,
    /// Header period.
    pub period: Period,
    /// Header date.
    pub date: NaiveDate,
    /// Header kind.
    pub kind: TransactionKind,
}

/// A directed allocation from `matched_by` to `matched_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEdge {
    /// Unique identifier.
    pub id: MatchId,
    /// Header doing the matching.
    pub matched_by: HeaderId,
    /// Header being matched.
    pub matched_to: HeaderId,
    /// Amount deducted from `matched_to`'s due.
    pub value: Decimal,
    /// Period the allocation belongs to.
    pub period: Period,
}

impl MatchEdge {
    /// Returns true if `header` is either endpoint.
    #[must_use]
    pub fn touches(&self, header: HeaderId) -> bool {
        self.matched_by == header || self.matched_to == header
    }

    /// Returns the endpoint opposite `header`.
    #[must_use]
    pub fn other(&self, header: HeaderId) -> HeaderId {
        if self.matched_by == header {
            self.matched_to
        } else {
            self.matched_by
        }
    }
}
