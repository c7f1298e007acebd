//! Posting engine: turns header lines into balanced general ledger postings.
//!
//! Sign rule: for a kind, `f = +1` when it is positive and a debit (or
//! negative and a credit), otherwise `f = -1`. Goods and vat post `f * amount`
//! and the total posts `-f * (goods + vat)`, so a line's postings always sum
//! to zero.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tallybook_shared::types::{AccountId, LineId, PostingId};
use tracing::debug;

use super::accounts::SystemAccounts;
use super::error::LedgerError;
use super::kind::{Module, TransactionKind};
use super::types::{Component, Header, Line, NewPosting, Posting};
use crate::store::LedgerStore;

/// Where the total component of an analysed line posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalAccount {
    /// Module control account (purchase or sales ledger).
    Control,
    /// The header's bank account (cash book).
    Bank,
}

/// How a header kind posts to the general ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingStrategy {
    /// Balances only: no postings, VAT or cash book.
    BroughtForward,
    /// Three postings per line.
    AnalysedLines {
        /// Account receiving each line's total.
        total_to: TotalAccount,
    },
    /// Bank leg and control leg for a payment without lines.
    TwoLeg,
}

impl PostingStrategy {
    /// Selects the strategy for `kind`.
    #[must_use]
    pub fn for_kind(kind: TransactionKind) -> Self {
        let class = kind.classify();
        if !class.requires_analysis {
            Self::BroughtForward
        } else if !class.requires_lines {
            Self::TwoLeg
        } else if kind.module() == Module::CashBook {
            Self::AnalysedLines {
                total_to: TotalAccount::Bank,
            }
        } else {
            Self::AnalysedLines {
                total_to: TotalAccount::Control,
            }
        }
    }

    /// Returns true if lines of this strategy carry VAT entries.
    #[must_use]
    pub fn has_vat(self) -> bool {
        matches!(self, Self::AnalysedLines { .. })
    }

    /// Returns true if the header moves money through its bank account.
    #[must_use]
    pub fn uses_bank(self) -> bool {
        matches!(
            self,
            Self::TwoLeg
                | Self::AnalysedLines {
                    total_to: TotalAccount::Bank
                }
        )
    }

    /// Value of the bank side of `header`'s postings, `None` when the header
    /// does not touch a bank account.
    #[must_use]
    pub fn bank_value(self, header: &Header) -> Option<Decimal> {
        let f = header.kind.classify().sign();
        match self {
            Self::TwoLeg => Some(f * header.total),
            Self::AnalysedLines {
                total_to: TotalAccount::Bank,
            } => Some(-f * header.total),
            _ => None,
        }
    }
}

/// Accounts used for the vat and total components of analysed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAccounts {
    /// VAT control account.
    pub vat: AccountId,
    /// Control or bank account.
    pub total: AccountId,
}

/// Lines of a header being edited, split by what happens to them.
#[derive(Debug, Clone, Default)]
pub struct LineEdits {
    /// Lines added by this edit.
    pub new: Vec<Line>,
    /// Lines kept (changed or not).
    pub retained: Vec<Line>,
    /// Lines removed by this edit.
    pub deleted: Vec<Line>,
}

/// Stateless posting engine.
pub struct PostingEngine;

impl PostingEngine {
    /// Creates the postings for a newly created header.
    ///
    /// # Arguments
    ///
    /// * `store` - Record store inside the current unit of work
    /// * `header` - The header, already stored
    /// * `lines` - Its lines, already stored; back-references are set and
    ///   persisted
    /// * `accounts` - Resolved system accounts
    ///
    /// # Returns
    ///
    /// The postings created.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a required account is missing or the store fails.
    pub fn post<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        lines: &mut [Line],
        accounts: &SystemAccounts,
    ) -> Result<Vec<Posting>, LedgerError> {
        match PostingStrategy::for_kind(header.kind) {
            PostingStrategy::BroughtForward => Ok(Vec::new()),
            PostingStrategy::AnalysedLines { total_to } => {
                let line_accounts = Self::line_accounts(header, total_to, accounts)?;
                Self::post_lines(store, header, lines, line_accounts)
            }
            PostingStrategy::TwoLeg => {
                let (bank, control) = Self::payment_accounts(header, accounts)?;
                Self::post_payment(store, header, bank, control)
            }
        }
    }

    /// Brings the postings of an edited header up to date.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a required account is missing or the store fails.
    pub fn repost<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        edits: &mut LineEdits,
        accounts: &SystemAccounts,
    ) -> Result<Vec<Posting>, LedgerError> {
        let existing = store.postings(header.id)?;
        match PostingStrategy::for_kind(header.kind) {
            PostingStrategy::BroughtForward => Ok(Vec::new()),
            PostingStrategy::AnalysedLines { total_to } => {
                let line_accounts = Self::line_accounts(header, total_to, accounts)?;
                Self::repost_lines(store, header, &existing, edits, line_accounts)
            }
            PostingStrategy::TwoLeg => {
                let (bank, control) = Self::payment_accounts(header, accounts)?;
                Self::repost_payment(store, header, &existing, bank, control)
            }
        }
    }

    fn line_accounts(
        header: &Header,
        total_to: TotalAccount,
        accounts: &SystemAccounts,
    ) -> Result<LineAccounts, LedgerError> {
        let total = match total_to {
            TotalAccount::Control => accounts.control(header.module()),
            TotalAccount::Bank => header.bank_account,
        };
        let total = total.ok_or_else(|| missing_account(header, "total"))?;
        Ok(LineAccounts {
            vat: accounts.vat.account,
            total,
        })
    }

    fn payment_accounts(
        header: &Header,
        accounts: &SystemAccounts,
    ) -> Result<(AccountId, AccountId), LedgerError> {
        let bank = header
            .bank_account
            .ok_or_else(|| missing_account(header, "bank"))?;
        let control = accounts
            .control(header.module())
            .ok_or_else(|| missing_account(header, "control"))?;
        Ok((bank, control))
    }

    /// Creates the postings for analysed lines and links them back.
    ///
    /// Lines are processed in line order; the store may return the inserted
    /// postings in any order, so they are re-correlated by line and
    /// component before the back-references are written.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a line with goods has no account or the store fails.
    pub fn post_lines<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        lines: &mut [Line],
        accounts: LineAccounts,
    ) -> Result<Vec<Posting>, LedgerError> {
        lines.sort_by_key(|l| l.line_no);

        let mut batch = Vec::with_capacity(lines.len() * 3);
        for line in lines.iter() {
            for component in Component::ALL {
                if let Some(posting) = Self::line_posting(header, line, component, accounts)? {
                    batch.push(posting);
                }
            }
        }

        debug!(header = %header.id, postings = batch.len(), "creating line postings");
        let inserted = store.insert_postings(batch)?;
        link_back_refs(lines, &inserted);
        store.update_lines(lines)?;
        Ok(inserted)
    }

    /// Re-posts analysed lines after an edit.
    ///
    /// Existing postings of retained lines are updated in place, deleted when
    /// their value becomes zero, and created when a component becomes
    /// non-zero. Postings of deleted lines are removed. Updates and deletions
    /// are each written as one batch once everything has been recomputed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a line with goods has no account or the store fails.
    pub fn repost_lines<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        existing: &[Posting],
        edits: &mut LineEdits,
        accounts: LineAccounts,
    ) -> Result<Vec<Posting>, LedgerError> {
        let by_key: HashMap<(LineId, Component), PostingId> = existing
            .iter()
            .filter_map(|p| p.line_id.map(|line_id| ((line_id, p.component), p.id)))
            .collect();

        let mut updates = Vec::new();
        let mut deletes = Vec::new();
        let mut creates = Vec::new();

        for line in &edits.deleted {
            for component in Component::ALL {
                if let Some(id) = by_key.get(&(line.id, component)) {
                    deletes.push(*id);
                }
            }
        }

        for line in &mut edits.retained {
            for component in Component::ALL {
                let draft = Self::line_posting(header, line, component, accounts)?;
                match (by_key.get(&(line.id, component)).copied(), draft) {
                    (Some(id), Some(draft)) => {
                        updates.push(draft.with_id(id));
                        line.set_posting_ref(component, Some(id));
                    }
                    (Some(id), None) => {
                        deletes.push(id);
                        line.set_posting_ref(component, None);
                    }
                    (None, Some(draft)) => creates.push(draft),
                    (None, None) => line.set_posting_ref(component, None),
                }
            }
        }

        for line in &edits.new {
            for component in Component::ALL {
                if let Some(draft) = Self::line_posting(header, line, component, accounts)? {
                    creates.push(draft);
                }
            }
        }

        debug!(
            header = %header.id,
            updated = updates.len(),
            deleted = deletes.len(),
            created = creates.len(),
            "reposting lines"
        );

        store.update_postings(&updates)?;
        store.delete_postings(&deletes)?;
        let inserted = store.insert_postings(creates)?;

        link_back_refs(&mut edits.retained, &inserted);
        link_back_refs(&mut edits.new, &inserted);
        store.update_lines(&edits.retained)?;
        store.update_lines(&edits.new)?;

        updates.extend(inserted);
        Ok(updates)
    }

    /// Creates the two payment legs: bank (line 1) and control (line 2).
    ///
    /// Nothing is posted when the total is zero.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the store fails.
    pub fn post_payment<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        bank: AccountId,
        control: AccountId,
    ) -> Result<Vec<Posting>, LedgerError> {
        let legs = Self::payment_legs(header, bank, control);
        if legs.is_empty() {
            return Ok(Vec::new());
        }
        store.insert_postings(legs)
    }

    /// Brings the two payment legs up to date.
    ///
    /// Legs are updated in place while the total is non-zero, deleted when it
    /// becomes zero and created when none exist yet.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the store fails.
    pub fn repost_payment<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        existing: &[Posting],
        bank: AccountId,
        control: AccountId,
    ) -> Result<Vec<Posting>, LedgerError> {
        let mut wanted: HashMap<u32, NewPosting> = Self::payment_legs(header, bank, control)
            .into_iter()
            .map(|leg| (leg.line_no, leg))
            .collect();

        let mut updates = Vec::new();
        let mut deletes = Vec::new();
        for posting in existing {
            match wanted.remove(&posting.line_no) {
                Some(leg) => updates.push(leg.with_id(posting.id)),
                None => deletes.push(posting.id),
            }
        }
        let mut creates: Vec<NewPosting> = wanted.into_values().collect();
        creates.sort_by_key(|leg| leg.line_no);

        store.update_postings(&updates)?;
        store.delete_postings(&deletes)?;
        let inserted = store.insert_postings(creates)?;
        updates.extend(inserted);
        Ok(updates)
    }

    fn payment_legs(header: &Header, bank: AccountId, control: AccountId) -> Vec<NewPosting> {
        if header.total.is_zero() {
            return Vec::new();
        }
        let value = header.kind.classify().sign() * header.total;
        vec![
            new_posting(header, None, 1, bank, value, Component::Total),
            new_posting(header, None, 2, control, -value, Component::Total),
        ]
    }

    /// Builds the posting for one component of a line, or `None` when its
    /// value is zero.
    fn line_posting(
        header: &Header,
        line: &Line,
        component: Component,
        accounts: LineAccounts,
    ) -> Result<Option<NewPosting>, LedgerError> {
        let f = header.kind.classify().sign();
        let value = match component {
            Component::Goods | Component::Vat => f * line.component_value(component),
            Component::Total => -f * line.component_value(component),
        };
        if value.is_zero() {
            return Ok(None);
        }
        let account = match component {
            Component::Goods => line.account.ok_or_else(|| {
                LedgerError::Internal(format!(
                    "line {} of {} has goods but no account",
                    line.line_no, header.id
                ))
            })?,
            Component::Vat => accounts.vat,
            Component::Total => accounts.total,
        };
        Ok(Some(new_posting(
            header,
            Some(line.id),
            line.line_no,
            account,
            value,
            component,
        )))
    }
}

/// Sets each line's back-reference to the inserted posting carrying the
/// same line and component. References of components without an inserted
/// posting are left as they are.
pub fn link_back_refs(lines: &mut [Line], inserted: &[Posting]) {
    let by_key: HashMap<(LineId, Component), PostingId> = inserted
        .iter()
        .filter_map(|p| p.line_id.map(|line_id| ((line_id, p.component), p.id)))
        .collect();
    for line in lines {
        for component in Component::ALL {
            if let Some(id) = by_key.get(&(line.id, component)) {
                line.set_posting_ref(component, Some(*id));
            }
        }
    }
}

fn new_posting(
    header: &Header,
    line_id: Option<LineId>,
    line_no: u32,
    account: AccountId,
    value: Decimal,
    component: Component,
) -> NewPosting {
    NewPosting {
        module: header.module(),
        header_id: header.id,
        line_id,
        line_no,
        account,
        value,
        reference: header.reference.clone(),
        period: header.period,
        date: header.date,
        kind: header.kind,
        component,
    }
}

fn missing_account(header: &Header, which: &str) -> LedgerError {
    LedgerError::Internal(format!("{} {} has no {which} account", header.kind, header.id))
}
