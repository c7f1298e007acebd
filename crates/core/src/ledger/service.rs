//! Ledger service: create, edit and void transactions as one unit of work.
//!
//! Every operation validates first, collecting all violations, and writes only
//! once nothing is left to reject. The postings balance is checked before the
//! unit of work commits.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallybook_shared::LedgerConfig;
use tallybook_shared::types::{AccountId, ContactId, HeaderId, LineId};
use tracing::info;

use super::accounts::{ChartOfAccounts, SystemAccounts};
use super::cashbook::CashBookEngine;
use super::error::{LedgerError, ValidationErrors, Violation};
use super::kind::TransactionKind;
use super::matching::{MatchInput, MatchPlan, MatchingEngine};
use super::posting::{LineEdits, PostingEngine, PostingStrategy};
use super::types::{
    CashBookEntry, Header, HeaderStatus, Line, MatchEdge, Posting, VatCode, VatDirection,
    VatEntry,
};
use super::validation::{validate_balance, validate_transaction};
use super::vat::VatEngine;
use super::void::{VoidEngine, VoidOutcome};
use crate::fiscal::Period;
use crate::store::{LedgerStore, Transactional};

/// Header fields as entered. Amounts are presentation values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInput {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Supplier or customer.
    pub contact_id: ContactId,
    /// Free-text reference.
    #[serde(default)]
    pub reference: String,
    /// Transaction date.
    pub date: NaiveDate,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Accounting period.
    pub period: Period,
    /// Total for kinds without lines; ignored when lines are required.
    #[serde(default)]
    pub total: Decimal,
    /// Bank account for payment kinds.
    #[serde(default)]
    pub bank_account: Option<AccountId>,
    /// VAT direction for cash book headers.
    #[serde(default)]
    pub vat_direction: Option<VatDirection>,
}

/// A line as entered. Amounts are presentation values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// Existing line to update or delete; `None` for a new line.
    #[serde(default)]
    pub id: Option<LineId>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Goods amount.
    #[serde(default)]
    pub goods: Decimal,
    /// VAT amount.
    #[serde(default)]
    pub vat: Decimal,
    /// Nominal account for goods.
    #[serde(default)]
    pub account: Option<AccountId>,
    /// VAT code.
    #[serde(default)]
    pub vat_code: Option<VatCode>,
    /// Marks an existing line for removal.
    #[serde(default)]
    pub deleted: bool,
}

/// Input for creating a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransactionInput {
    /// Header fields.
    pub header: HeaderInput,
    /// Lines.
    #[serde(default)]
    pub lines: Vec<LineInput>,
    /// Matches to apply with the new header as subject.
    #[serde(default)]
    pub matches: Vec<MatchInput>,
}

/// Input for editing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTransactionInput {
    /// Header being edited.
    pub header_id: HeaderId,
    /// Replacement header fields.
    pub header: HeaderInput,
    /// Line changes; lines not mentioned are kept.
    #[serde(default)]
    pub lines: Vec<LineInput>,
    /// Match changes; edges not mentioned are kept.
    #[serde(default)]
    pub matches: Vec<MatchInput>,
}

/// A header with everything stored against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// The header.
    pub header: Header,
    /// Lines in line order.
    pub lines: Vec<Line>,
    /// General ledger postings.
    pub postings: Vec<Posting>,
    /// VAT register entries.
    pub vat_entries: Vec<VatEntry>,
    /// Cash book entry, if the header moves money through a bank.
    pub cash_book: Option<CashBookEntry>,
    /// Matching edges in either role.
    pub matches: Vec<MatchEdge>,
}

impl TransactionResult {
    /// Reads a header and its records from `store`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::HeaderNotFound` or a store error.
    pub fn load<S: LedgerStore + ?Sized>(store: &S, id: HeaderId) -> Result<Self, LedgerError> {
        let header = store.header(id)?.ok_or(LedgerError::HeaderNotFound(id))?;
        Ok(Self {
            header,
            lines: store.lines(id)?,
            postings: store.postings(id)?,
            vat_entries: store.vat_entries(id)?,
            cash_book: store.cash_book_entries(id)?.into_iter().next(),
            matches: store.matches(id)?,
        })
    }
}

/// Ledger service for transaction orchestration.
///
/// Holds no state; the record store and chart of accounts are passed in.
pub struct LedgerService;

impl LedgerService {
    /// Creates a header with its lines, postings, VAT and cash book entries
    /// and matches.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Transactional record store
    /// * `chart` - Chart of accounts used to resolve system accounts
    /// * `config` - Names of the system accounts
    /// * `input` - The transaction as entered
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` with every broken rule, or any store
    /// or integrity error. Nothing is written on error.
    pub fn create<T, C>(
        ledger: &mut T,
        chart: &C,
        config: &LedgerConfig,
        input: &CreateTransactionInput,
    ) -> Result<TransactionResult, LedgerError>
    where
        T: Transactional,
        C: ChartOfAccounts + ?Sized,
    {
        let accounts = SystemAccounts::resolve(chart, config);
        let result = ledger.atomically(|store| {
            let mut header = Header {
                id: HeaderId::new(),
                kind: input.header.kind,
                contact_id: input.header.contact_id,
                reference: String::new(),
                goods: Decimal::ZERO,
                vat: Decimal::ZERO,
                total: Decimal::ZERO,
                paid: Decimal::ZERO,
                due: Decimal::ZERO,
                date: input.header.date,
                due_date: None,
                period: input.header.period,
                status: HeaderStatus::Cleared,
                bank_account: None,
                vat_direction: None,
            };
            apply_header_input(&mut header, &input.header);

            let mut lines = Vec::new();
            let mut line_no = 0;
            for entered in input.lines.iter().filter(|l| !l.deleted) {
                line_no += 1;
                lines.push(new_line(&header, entered, line_no));
            }
            set_totals(&mut header, &lines, input.header.total);

            let mut violations = validate_transaction(&header, &lines);
            let plan = plan_matches(&*store, &header, &[], &input.matches, &mut violations)?;
            let plan = checked_plan(plan, violations)?;

            store.insert_header(header.clone())?;
            store.insert_lines(&lines)?;
            PostingEngine::post(store, &header, &mut lines, &accounts)?;
            if PostingStrategy::for_kind(header.kind).has_vat() {
                VatEngine::post(store, &header, &mut lines)?;
            }
            CashBookEngine::sync(store, &header)?;
            MatchingEngine::apply(store, &plan)?;

            validate_balance(header.id, &store.postings(header.id)?)?;
            TransactionResult::load(&*store, header.id)
        })?;

        info!(
            header = %result.header.id,
            kind = %result.header.kind,
            total = %result.header.total,
            postings = result.postings.len(),
            "transaction created"
        );
        Ok(result)
    }

    /// Edits a header, its lines and its matches.
    ///
    /// The kind may change only within the same module, posting behaviour and
    /// sign. The contact may change only while the header has no matches.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CannotModifyVoided`, `LedgerError::KindMismatch`,
    /// `LedgerError::LineNotFound`, `LedgerError::Validation` or any store or
    /// integrity error. Nothing is written on error.
    pub fn edit<T, C>(
        ledger: &mut T,
        chart: &C,
        config: &LedgerConfig,
        input: &EditTransactionInput,
    ) -> Result<TransactionResult, LedgerError>
    where
        T: Transactional,
        C: ChartOfAccounts + ?Sized,
    {
        let accounts = SystemAccounts::resolve(chart, config);
        let result = ledger.atomically(|store| {
            let current = store
                .header(input.header_id)?
                .ok_or(LedgerError::HeaderNotFound(input.header_id))?;
            if current.is_void() {
                return Err(LedgerError::CannotModifyVoided(current.id));
            }
            check_kind_change(current.kind, input.header.kind)?;

            let mut header = current.clone();
            apply_header_input(&mut header, &input.header);
            let mut edits = diff_lines(&header, store.lines(header.id)?, &input.lines)?;
            let lines: Vec<Line> = edits.retained.iter().chain(&edits.new).cloned().collect();
            set_totals(&mut header, &lines, input.header.total);

            let mut violations = validate_transaction(&header, &lines);
            let existing = store.matches(header.id)?;
            violations.extend(MatchingEngine::guard_contact_change(
                &current,
                header.contact_id,
                &existing,
            ));
            let plan =
                plan_matches(&*store, &header, &existing, &input.matches, &mut violations)?;
            let plan = checked_plan(plan, violations)?;
            let header = plan
                .subject()
                .cloned()
                .ok_or_else(|| LedgerError::Internal("match plan has no subject".into()))?;

            let deleted: Vec<LineId> = edits.deleted.iter().map(|l| l.id).collect();
            store.delete_lines(&deleted)?;
            store.update_lines(&edits.retained)?;
            store.insert_lines(&edits.new)?;
            PostingEngine::repost(store, &header, &mut edits, &accounts)?;
            if PostingStrategy::for_kind(header.kind).has_vat() {
                VatEngine::repost(store, &header, &mut edits)?;
            }
            CashBookEngine::sync(store, &header)?;
            MatchingEngine::apply(store, &plan)?;

            validate_balance(header.id, &store.postings(header.id)?)?;
            TransactionResult::load(&*store, header.id)
        })?;

        info!(
            header = %result.header.id,
            kind = %result.header.kind,
            total = %result.header.total,
            lines = result.lines.len(),
            "transaction edited"
        );
        Ok(result)
    }

    /// Changes only the matches of a stored header.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CannotModifyVoided`, `LedgerError::Validation` or
    /// a store error. Nothing is written on error.
    pub fn apply_matches<T: Transactional>(
        ledger: &mut T,
        subject: HeaderId,
        inputs: &[MatchInput],
    ) -> Result<MatchPlan, LedgerError> {
        let plan =
            ledger.atomically(|store| MatchingEngine::apply_matches(store, subject, inputs))?;
        info!(
            header = %subject,
            upserts = plan.upserts.len(),
            deletes = plan.deletes.len(),
            "matches applied"
        );
        Ok(plan)
    }

    /// Voids a header.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AlreadyVoid`, `LedgerError::HeaderNotFound` or a
    /// store error.
    pub fn void<T: Transactional>(
        ledger: &mut T,
        header_id: HeaderId,
    ) -> Result<VoidOutcome, LedgerError> {
        let outcome = ledger.atomically(|store| VoidEngine::void(store, header_id))?;
        info!(
            header = %header_id,
            postings = outcome.postings_removed,
            matches = outcome.matches_removed,
            "transaction voided"
        );
        Ok(outcome)
    }
}

fn apply_header_input(header: &mut Header, input: &HeaderInput) {
    header.kind = input.kind;
    header.contact_id = input.contact_id;
    header.reference.clone_from(&input.reference);
    header.date = input.date;
    header.due_date = input.due_date;
    header.period = input.period;
    header.bank_account = input.bank_account;
    header.vat_direction = input.vat_direction;
}

/// Sets goods, vat and total from the lines, or from the entered total for
/// kinds without lines. `due` follows the new total with nothing paid; the
/// match plan replaces it.
fn set_totals(header: &mut Header, lines: &[Line], entered_total: Decimal) {
    if header.kind.classify().requires_lines {
        header.goods = lines.iter().map(|l| l.goods).sum();
        header.vat = lines.iter().map(|l| l.vat).sum();
        header.total = header.goods + header.vat;
    } else {
        header.total = header.kind.signed(entered_total);
        header.goods = header.total;
        header.vat = Decimal::ZERO;
    }
    header.set_due(header.total);
}

fn new_line(header: &Header, input: &LineInput, line_no: u32) -> Line {
    let mut line = Line {
        id: LineId::new(),
        header_id: header.id,
        line_no,
        description: String::new(),
        goods: Decimal::ZERO,
        vat: Decimal::ZERO,
        account: None,
        vat_code: None,
        goods_posting: None,
        vat_posting: None,
        total_posting: None,
        vat_entry: None,
    };
    fill_line(&mut line, header.kind, input);
    line
}

fn fill_line(line: &mut Line, kind: TransactionKind, input: &LineInput) {
    line.description.clone_from(&input.description);
    line.goods = kind.signed(input.goods);
    line.vat = kind.signed(input.vat);
    line.account = input.account;
    line.vat_code.clone_from(&input.vat_code);
}

/// Splits entered lines into new, retained and deleted against the stored
/// lines, then renumbers the survivors densely from 1.
fn diff_lines(
    header: &Header,
    stored: Vec<Line>,
    inputs: &[LineInput],
) -> Result<LineEdits, LedgerError> {
    let known: HashSet<LineId> = stored.iter().map(|l| l.id).collect();
    let mut updates: HashMap<LineId, &LineInput> = HashMap::new();
    let mut removals: HashSet<LineId> = HashSet::new();
    let mut edits = LineEdits::default();

    for input in inputs {
        match input.id {
            Some(id) if !known.contains(&id) => return Err(LedgerError::LineNotFound(id)),
            Some(id) if input.deleted => {
                removals.insert(id);
            }
            Some(id) => {
                updates.insert(id, input);
            }
            None if input.deleted => {}
            None => edits.new.push(new_line(header, input, 0)),
        }
    }

    for mut line in stored {
        if removals.contains(&line.id) {
            edits.deleted.push(line);
            continue;
        }
        if let Some(input) = updates.get(&line.id) {
            fill_line(&mut line, header.kind, input);
        }
        edits.retained.push(line);
    }

    let mut line_no = 0;
    for line in edits.retained.iter_mut().chain(edits.new.iter_mut()) {
        line_no += 1;
        line.line_no = line_no;
    }
    Ok(edits)
}

fn check_kind_change(from: TransactionKind, to: TransactionKind) -> Result<(), LedgerError> {
    let compatible = from.module() == to.module()
        && PostingStrategy::for_kind(from) == PostingStrategy::for_kind(to)
        && from.classify().is_positive == to.classify().is_positive;
    if compatible {
        Ok(())
    } else {
        Err(LedgerError::KindMismatch { from, to })
    }
}

/// Plans matches for `subject`, moving any violations into `violations`.
fn plan_matches<S: LedgerStore + ?Sized>(
    store: &S,
    subject: &Header,
    existing: &[MatchEdge],
    inputs: &[MatchInput],
    violations: &mut Vec<Violation>,
) -> Result<Option<MatchPlan>, LedgerError> {
    let counterparts = MatchingEngine::load_counterparts(store, subject.id, existing, inputs)?;
    match MatchingEngine::plan(subject, existing, &counterparts, inputs) {
        Ok(plan) => Ok(Some(plan)),
        Err(LedgerError::Validation(errors)) => {
            violations.extend(errors.into_violations());
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn checked_plan(
    plan: Option<MatchPlan>,
    violations: Vec<Violation>,
) -> Result<MatchPlan, LedgerError> {
    if let Some(errors) = ValidationErrors::from_violations(violations) {
        return Err(errors.into());
    }
    plan.ok_or_else(|| LedgerError::Internal("match plan missing without violations".into()))
}
