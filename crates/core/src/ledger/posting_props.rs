//! Property-based tests for posting through the ledger service.
//!
//! - Postings of every analysed header sum to zero after create and edit
//! - Editing a line away and back reproduces the original postings

use proptest::prelude::*;
use rust_decimal::Decimal;
use tallybook_shared::LedgerConfig;
use tallybook_shared::types::ContactId;

use super::accounts::{AccountDirectory, ChartOfAccounts};
use super::fixtures::{chart, date, period, standard_rate};
use super::kind::TransactionKind;
use super::service::{
    CreateTransactionInput, EditTransactionInput, HeaderInput, LedgerService, LineInput,
    TransactionResult,
};
use super::types::{Component, Posting};
use crate::store::InMemoryLedger;

/// Strategy to generate amounts from 0.00 to 10,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Goods and vat that are not both zero.
fn line_amounts() -> impl Strategy<Value = (Decimal, Decimal)> {
    (amount(), amount()).prop_filter("goods and vat both zero", |(g, v)| {
        !(g.is_zero() && v.is_zero())
    })
}

/// Analysed kinds that carry lines.
fn analysed_kind() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        Just(TransactionKind::Pi),
        Just(TransactionKind::Pc),
        Just(TransactionKind::Si),
        Just(TransactionKind::Sc),
        Just(TransactionKind::Cp),
        Just(TransactionKind::Cr),
    ]
}

fn header_input(chart: &AccountDirectory, kind: TransactionKind) -> HeaderInput {
    HeaderInput {
        kind,
        contact_id: ContactId::from_uuid(uuid::Uuid::nil()),
        reference: "prop".to_string(),
        date: date(2020, 1, 15),
        due_date: None,
        period: period("202001"),
        total: Decimal::ZERO,
        bank_account: chart.find("Bank"),
        vat_direction: None,
    }
}

fn line_input(chart: &AccountDirectory, (goods, vat): (Decimal, Decimal)) -> LineInput {
    LineInput {
        goods,
        vat,
        account: chart.find("Purchases"),
        vat_code: Some(standard_rate()),
        ..LineInput::default()
    }
}

fn create(
    ledger: &mut InMemoryLedger,
    chart: &AccountDirectory,
    kind: TransactionKind,
    lines: &[(Decimal, Decimal)],
) -> TransactionResult {
    let input = CreateTransactionInput {
        header: header_input(chart, kind),
        lines: lines.iter().map(|l| line_input(chart, *l)).collect(),
        matches: vec![],
    };
    LedgerService::create(ledger, chart, &LedgerConfig::default(), &input)
        .expect("valid transaction")
}

fn sum(postings: &[Posting]) -> Decimal {
    postings.iter().map(|p| p.value).sum()
}

/// Postings keyed by line number and component, for comparison across edits.
fn shape(postings: &[Posting]) -> Vec<(u32, Component, Decimal, String)> {
    let mut shape: Vec<_> = postings
        .iter()
        .map(|p| (p.line_no, p.component, p.value, p.account.to_string()))
        .collect();
    shape.sort();
    shape
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Postings of a created header always sum to zero.
    #[test]
    fn prop_create_balances(
        kind in analysed_kind(),
        lines in prop::collection::vec(line_amounts(), 1..8),
    ) {
        let chart = chart();
        let mut ledger = InMemoryLedger::new();
        let result = create(&mut ledger, &chart, kind, &lines);

        prop_assert_eq!(sum(&result.postings), Decimal::ZERO);
        prop_assert!(result.postings.len() <= lines.len() * 3);
        prop_assert!(result.header.amounts_consistent());
        let expected: Decimal = lines.iter().map(|(g, v)| g + v).sum();
        prop_assert_eq!(result.header.ui_total(), expected);
    }

    /// Postings still sum to zero after replacing every line's amounts.
    #[test]
    fn prop_edit_balances(
        kind in analysed_kind(),
        before in prop::collection::vec(line_amounts(), 1..6),
        after in prop::collection::vec(line_amounts(), 1..6),
    ) {
        let chart = chart();
        let mut ledger = InMemoryLedger::new();
        let created = create(&mut ledger, &chart, kind, &before);

        let lines = created
            .lines
            .iter()
            .zip(after.iter().chain(std::iter::repeat(&before[0])))
            .map(|(line, amounts)| LineInput { id: Some(line.id), ..line_input(&chart, *amounts) })
            .collect();
        let input = EditTransactionInput {
            header_id: created.header.id,
            header: header_input(&chart, kind),
            lines,
            matches: vec![],
        };
        let edited = LedgerService::edit(&mut ledger, &chart, &LedgerConfig::default(), &input)
            .expect("valid edit");

        prop_assert_eq!(sum(&edited.postings), Decimal::ZERO);
        let expected: Decimal = edited.lines.iter().map(|l| l.goods + l.vat).sum();
        prop_assert_eq!(edited.header.total, expected);
    }

    /// Editing one line away and back reproduces the original postings.
    #[test]
    fn prop_edit_round_trip(
        kind in analysed_kind(),
        original in line_amounts(),
        changed in line_amounts(),
    ) {
        let chart = chart();
        let config = LedgerConfig::default();
        let mut ledger = InMemoryLedger::new();
        let created = create(&mut ledger, &chart, kind, &[original]);
        let line_id = created.lines[0].id;

        for amounts in [changed, original] {
            let input = EditTransactionInput {
                header_id: created.header.id,
                header: header_input(&chart, kind),
                lines: vec![LineInput { id: Some(line_id), ..line_input(&chart, amounts) }],
                matches: vec![],
            };
            LedgerService::edit(&mut ledger, &chart, &config, &input).expect("valid edit");
        }

        let restored = ledger
            .state()
            .all_postings()
            .filter(|p| p.header_id == created.header.id)
            .cloned()
            .collect::<Vec<_>>();
        prop_assert_eq!(shape(&restored), shape(&created.postings));
    }
}
