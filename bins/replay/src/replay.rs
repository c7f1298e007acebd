//! Runs scenario steps against an in-memory ledger and reports the result.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use serde::Serialize;
use tallybook_core::fiscal::Period;
use tallybook_core::ledger::{
    AccountDirectory, ChartOfAccounts, Component, CreateTransactionInput, EditTransactionInput,
    HeaderInput, HeaderStatus, LedgerError, LedgerService, LineInput, MatchInput,
    TransactionKind,
};
use tallybook_core::store::{InMemoryLedger, LedgerStore};
use tallybook_shared::LedgerConfig;
use tallybook_shared::types::{AccountId, ContactId, HeaderId, LineId};
use tracing::{info, warn};

use crate::scenario::{HeaderSpec, LineSpec, MatchSpec, Step};

/// Replay state: the ledger plus the scenario's names.
pub struct Replay {
    ledger: InMemoryLedger,
    chart: AccountDirectory,
    config: LedgerConfig,
    aliases: BTreeMap<String, HeaderId>,
    contacts: HashMap<String, ContactId>,
    rejected: Vec<Rejection>,
}

/// A step the engine or the scenario refused.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    /// Zero-based step index.
    pub step: usize,
    /// Step action.
    pub action: &'static str,
    /// Header alias.
    pub alias: String,
    /// Error code.
    pub code: &'static str,
    /// Error message.
    pub message: String,
}

/// Final ledger state.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Headers by alias.
    pub headers: Vec<HeaderView>,
    /// Every matching edge.
    pub matches: Vec<MatchView>,
    /// Rejected steps.
    pub rejected: Vec<Rejection>,
}

/// One header with its postings.
#[derive(Debug, Serialize)]
pub struct HeaderView {
    /// Alias.
    pub alias: String,
    /// Kind.
    pub kind: TransactionKind,
    /// Reference.
    pub reference: String,
    /// Period.
    pub period: Period,
    /// Status.
    pub status: HeaderStatus,
    /// Stored total.
    pub total: Decimal,
    /// Stored paid.
    pub paid: Decimal,
    /// Stored due.
    pub due: Decimal,
    /// Postings in line order.
    pub postings: Vec<PostingView>,
    /// Cash book value, if any.
    pub cash_book: Option<Decimal>,
}

/// A posting with its account name.
#[derive(Debug, Serialize)]
pub struct PostingView {
    /// Line number.
    pub line_no: u32,
    /// Component.
    pub component: Component,
    /// Account name.
    pub account: String,
    /// Signed value.
    pub value: Decimal,
}

/// A matching edge between aliases.
#[derive(Debug, Serialize)]
pub struct MatchView {
    /// Matching header.
    pub matched_by: String,
    /// Matched header.
    pub matched_to: String,
    /// Edge value.
    pub value: Decimal,
    /// Period written.
    pub period: Period,
}

impl Replay {
    /// Creates a replay with the given chart account names.
    pub fn new(config: LedgerConfig, accounts: &[String]) -> Self {
        let mut chart = AccountDirectory::new(&config.suspense_account);
        for name in accounts {
            chart.add(name);
        }
        Self {
            ledger: InMemoryLedger::new(),
            chart,
            config,
            aliases: BTreeMap::new(),
            contacts: HashMap::new(),
            rejected: Vec::new(),
        }
    }

    /// Runs every step; rejected steps are logged and recorded.
    pub fn run(&mut self, steps: &[Step]) {
        for (index, step) in steps.iter().enumerate() {
            match self.apply(step) {
                Ok(()) => info!(step = index, action = step.action(), alias = step.alias(), "step applied"),
                Err(err) => {
                    let code = err
                        .downcast_ref::<LedgerError>()
                        .map_or("SCENARIO_ERROR", LedgerError::error_code);
                    warn!(
                        step = index,
                        action = step.action(),
                        alias = step.alias(),
                        code,
                        error = %err,
                        "step rejected"
                    );
                    self.rejected.push(Rejection {
                        step: index,
                        action: step.action(),
                        alias: step.alias().to_string(),
                        code,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::Create {
                alias,
                header,
                lines,
                matches,
            } => {
                if self.aliases.contains_key(alias) {
                    bail!("alias {alias} is already in use");
                }
                let input = CreateTransactionInput {
                    header: self.header_input(header)?,
                    lines: lines
                        .iter()
                        .map(|l| self.line_input(l, None))
                        .collect::<anyhow::Result<_>>()?,
                    matches: self.match_inputs(matches)?,
                };
                let result =
                    LedgerService::create(&mut self.ledger, &self.chart, &self.config, &input)?;
                self.aliases.insert(alias.clone(), result.header.id);
            }
            Step::Edit {
                alias,
                header,
                lines,
                matches,
            } => {
                let id = self.header_id(alias)?;
                let stored = self.ledger.state().lines(id)?;
                let by_no: HashMap<u32, LineId> =
                    stored.iter().map(|l| (l.line_no, l.id)).collect();
                let input = EditTransactionInput {
                    header_id: id,
                    header: self.header_input(header)?,
                    lines: lines
                        .iter()
                        .map(|l| self.line_input(l, Some(&by_no)))
                        .collect::<anyhow::Result<_>>()?,
                    matches: self.match_inputs(matches)?,
                };
                LedgerService::edit(&mut self.ledger, &self.chart, &self.config, &input)?;
            }
            Step::Match { alias, matches } => {
                let id = self.header_id(alias)?;
                let inputs = self.match_inputs(matches)?;
                LedgerService::apply_matches(&mut self.ledger, id, &inputs)?;
            }
            Step::Void { alias } => {
                let id = self.header_id(alias)?;
                LedgerService::void(&mut self.ledger, id)?;
            }
        }
        Ok(())
    }

    fn header_id(&self, alias: &str) -> anyhow::Result<HeaderId> {
        self.aliases
            .get(alias)
            .copied()
            .with_context(|| format!("unknown header alias {alias}"))
    }

    fn account(&self, name: &str) -> anyhow::Result<AccountId> {
        self.chart
            .find(name)
            .with_context(|| format!("unknown account {name}"))
    }

    fn header_input(&mut self, spec: &HeaderSpec) -> anyhow::Result<HeaderInput> {
        let contact_id = *self
            .contacts
            .entry(spec.contact.clone())
            .or_insert_with(ContactId::new);
        Ok(HeaderInput {
            kind: spec.kind,
            contact_id,
            reference: spec.reference.clone(),
            date: spec.date,
            due_date: spec.due_date,
            period: spec.period,
            total: spec.total,
            bank_account: spec
                .bank_account
                .as_deref()
                .map(|name| self.account(name))
                .transpose()?,
            vat_direction: spec.vat_direction,
        })
    }

    fn line_input(
        &self,
        spec: &LineSpec,
        existing: Option<&HashMap<u32, LineId>>,
    ) -> anyhow::Result<LineInput> {
        let id = match (spec.line_no, existing) {
            (Some(no), Some(lines)) => Some(
                *lines
                    .get(&no)
                    .with_context(|| format!("header has no line {no}"))?,
            ),
            _ => None,
        };
        Ok(LineInput {
            id,
            description: spec.description.clone(),
            goods: spec.goods,
            vat: spec.vat,
            account: spec
                .account
                .as_deref()
                .map(|name| self.account(name))
                .transpose()?,
            vat_code: spec.vat_code.clone(),
            deleted: spec.deleted,
        })
    }

    fn match_inputs(&self, specs: &[MatchSpec]) -> anyhow::Result<Vec<MatchInput>> {
        specs
            .iter()
            .map(|spec| {
                Ok(MatchInput {
                    counterpart: self.header_id(&spec.counterpart)?,
                    role: spec.role,
                    value: spec.value,
                })
            })
            .collect()
    }

    /// Builds the report of the committed state.
    pub fn report(&self) -> anyhow::Result<Report> {
        let state = self.ledger.state();
        let names: HashMap<HeaderId, &str> = self
            .aliases
            .iter()
            .map(|(alias, id)| (*id, alias.as_str()))
            .collect();
        let name_of = |id: HeaderId| names.get(&id).map_or_else(|| id.to_string(), |n| (*n).to_string());

        let mut headers = Vec::with_capacity(self.aliases.len());
        for (alias, id) in &self.aliases {
            let header = state
                .header(*id)?
                .with_context(|| format!("header {alias} missing from store"))?;
            let mut postings: Vec<PostingView> = state
                .postings(*id)?
                .into_iter()
                .map(|p| PostingView {
                    line_no: p.line_no,
                    component: p.component,
                    account: self
                        .chart
                        .name_of(p.account)
                        .map_or_else(|| p.account.to_string(), str::to_string),
                    value: p.value,
                })
                .collect();
            postings.sort_by_key(|p| (p.line_no, p.component));
            headers.push(HeaderView {
                alias: alias.clone(),
                kind: header.kind,
                reference: header.reference,
                period: header.period,
                status: header.status,
                total: header.total,
                paid: header.paid,
                due: header.due,
                postings,
                cash_book: state.cash_book_entries(*id)?.first().map(|c| c.value),
            });
        }

        let matches = state
            .all_matches()
            .map(|edge| MatchView {
                matched_by: name_of(edge.matched_by),
                matched_to: name_of(edge.matched_to),
                value: edge.value,
                period: edge.period,
            })
            .collect();

        Ok(Report {
            headers,
            matches,
            rejected: self.rejected.clone(),
        })
    }
}
