//! End-to-end ledger scenarios against the in-memory store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tallybook_core::fiscal::Period;
use tallybook_core::ledger::{
    AccountDirectory, ChartOfAccounts, Component, CreateTransactionInput, EditTransactionInput,
    HeaderInput, HeaderStatus, LedgerError, LedgerService, LineInput, MatchInput, MatchRole,
    TransactionKind, TransactionResult, VatCode, Violation,
};
use tallybook_core::store::{InMemoryLedger, LedgerStore};
use tallybook_shared::LedgerConfig;
use tallybook_shared::types::ContactId;

struct Books {
    ledger: InMemoryLedger,
    chart: AccountDirectory,
    config: LedgerConfig,
    contact: ContactId,
}

impl Books {
    fn new() -> Self {
        let config = LedgerConfig::default();
        let mut chart = AccountDirectory::new(&config.suspense_account);
        for name in [
            config.vat_account.as_str(),
            config.purchase_control_account.as_str(),
            config.sales_control_account.as_str(),
            "Purchases",
            "Sales",
            "Bank",
        ] {
            chart.add(name);
        }
        Self::with_chart(chart, config)
    }

    fn with_chart(chart: AccountDirectory, config: LedgerConfig) -> Self {
        Self {
            ledger: InMemoryLedger::new(),
            chart,
            config,
            contact: ContactId::new(),
        }
    }

    fn header(&self, kind: TransactionKind, total: Decimal, period: &str) -> HeaderInput {
        HeaderInput {
            kind,
            contact_id: self.contact,
            reference: format!("{kind}"),
            date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            due_date: None,
            period: period.parse::<Period>().unwrap(),
            total,
            bank_account: self.chart.find("Bank"),
            vat_direction: None,
        }
    }

    fn line(&self, account: &str, goods: Decimal, vat: Decimal) -> LineInput {
        LineInput {
            description: "goods".into(),
            goods,
            vat,
            account: self.chart.find(account),
            vat_code: Some(VatCode {
                code: "S".into(),
                rate: dec!(20),
            }),
            ..LineInput::default()
        }
    }

    fn create(&mut self, input: &CreateTransactionInput) -> Result<TransactionResult, LedgerError> {
        LedgerService::create(&mut self.ledger, &self.chart, &self.config, input)
    }

    fn edit(&mut self, input: &EditTransactionInput) -> Result<TransactionResult, LedgerError> {
        LedgerService::edit(&mut self.ledger, &self.chart, &self.config, input)
    }

    fn invoice(
        &mut self,
        kind: TransactionKind,
        period: &str,
        lines: usize,
        goods: Decimal,
        vat: Decimal,
    ) -> TransactionResult {
        let account = if kind.module() == tallybook_core::ledger::Module::Sales {
            "Sales"
        } else {
            "Purchases"
        };
        let input = CreateTransactionInput {
            header: self.header(kind, Decimal::ZERO, period),
            lines: (0..lines).map(|_| self.line(account, goods, vat)).collect(),
            matches: vec![],
        };
        self.create(&input).unwrap()
    }

    fn payment(
        &mut self,
        kind: TransactionKind,
        total: Decimal,
        period: &str,
        matches: Vec<MatchInput>,
    ) -> Result<TransactionResult, LedgerError> {
        let input = CreateTransactionInput {
            header: self.header(kind, total, period),
            lines: vec![],
            matches,
        };
        self.create(&input)
    }
}

fn matched_by(counterpart: &TransactionResult, value: Decimal) -> MatchInput {
    MatchInput {
        counterpart: counterpart.header.id,
        role: MatchRole::MatchedBy,
        value,
    }
}

// ============================================================================
// Allocation bound
// ============================================================================

#[test]
fn test_payment_cannot_exceed_invoice_due() {
    let mut books = Books::new();
    let invoice = books.invoice(TransactionKind::Pi, "202001", 1, dec!(2000), dec!(500));
    assert_eq!(invoice.header.due, dec!(2500));

    let err = books
        .payment(
            TransactionKind::Pp,
            dec!(2400),
            "202001",
            vec![matched_by(&invoice, dec!(2600))],
        )
        .unwrap_err();
    assert!(err.violations().contains(&Violation::CounterpartBound {
        counterpart: invoice.header.id,
        value: dec!(2600),
        headroom: dec!(2500),
    }));
    assert!(
        err.to_string()
            .contains("value must be between 0 and 2500")
    );
    assert_eq!(books.ledger.state().all_headers().count(), 1);

    let payment = books
        .payment(
            TransactionKind::Pp,
            dec!(2400),
            "202001",
            vec![matched_by(&invoice, dec!(2400))],
        )
        .unwrap();
    let invoice = books.ledger.state().header(invoice.header.id).unwrap().unwrap();
    assert_eq!(invoice.due, dec!(100));
    assert_eq!(invoice.paid, dec!(2400));
    assert_eq!(payment.header.due, Decimal::ZERO);
    assert_eq!(payment.header.paid, dec!(-2400));
}

// ============================================================================
// Period guard
// ============================================================================

#[test]
fn test_match_into_later_period_rejected() {
    let mut books = Books::new();
    let invoice = books.invoice(TransactionKind::Pi, "202002", 1, dec!(100), Decimal::ZERO);

    let err = books
        .payment(
            TransactionKind::Pp,
            dec!(100),
            "202001",
            vec![matched_by(&invoice, dec!(100))],
        )
        .unwrap_err();

    assert!(matches!(
        err.violations(),
        [Violation::PeriodOrder { matched_to, .. }] if *matched_to == invoice.header.id
    ));
}

#[test]
fn test_moving_matched_header_before_counterpart_rejected() {
    let mut books = Books::new();
    let invoice = books.invoice(TransactionKind::Pi, "202002", 1, dec!(100), Decimal::ZERO);
    let payment = books
        .payment(
            TransactionKind::Pp,
            dec!(100),
            "202003",
            vec![matched_by(&invoice, dec!(100))],
        )
        .unwrap();

    let err = books
        .edit(&EditTransactionInput {
            header_id: payment.header.id,
            header: books.header(TransactionKind::Pp, dec!(100), "202001"),
            lines: vec![],
            matches: vec![],
        })
        .unwrap_err();

    assert!(
        err.violations()
            .iter()
            .any(|v| matches!(v, Violation::PeriodOrder { .. }))
    );
    let stored = books.ledger.state().header(payment.header.id).unwrap().unwrap();
    assert_eq!(stored.period.to_string(), "202003");
}

// ============================================================================
// Void reversal
// ============================================================================

#[test]
fn test_void_invoice_with_receipt() {
    let mut books = Books::new();
    let invoice = books.invoice(TransactionKind::Si, "202001", 20, dec!(100), dec!(20));
    assert_eq!(invoice.header.total, dec!(2400));
    assert_eq!(invoice.postings.len(), 60);
    assert_eq!(invoice.vat_entries.len(), 20);

    let receipt = books
        .payment(
            TransactionKind::Sp,
            dec!(600),
            "202001",
            vec![matched_by(&invoice, dec!(600))],
        )
        .unwrap();
    assert_eq!(receipt.header.total, dec!(-600));
    assert_eq!(receipt.header.due, Decimal::ZERO);

    let outcome = LedgerService::void(&mut books.ledger, invoice.header.id).unwrap();
    assert_eq!(outcome.postings_removed, 60);
    assert_eq!(outcome.matches_removed, 1);

    let state = books.ledger.state();
    let invoice_after = state.header(invoice.header.id).unwrap().unwrap();
    assert_eq!(invoice_after.status, HeaderStatus::Void);
    assert_eq!(invoice_after.paid, Decimal::ZERO);
    assert_eq!(invoice_after.due, dec!(2400));
    assert_eq!(invoice_after.total, dec!(2400));
    assert!(state.postings(invoice.header.id).unwrap().is_empty());
    assert!(state.vat_entries(invoice.header.id).unwrap().is_empty());
    assert!(state.matches(invoice.header.id).unwrap().is_empty());
    assert!(
        state
            .lines(invoice.header.id)
            .unwrap()
            .iter()
            .all(|l| l.goods_posting.is_none() && l.vat_entry.is_none())
    );

    let receipt_after = state.header(receipt.header.id).unwrap().unwrap();
    assert_eq!(receipt_after.status, HeaderStatus::Cleared);
    assert_eq!(receipt_after.total, dec!(-600));
    assert_eq!(receipt_after.due, dec!(-600));
    assert_eq!(state.postings(receipt.header.id).unwrap().len(), 2);
}

#[test]
fn test_void_twice_rejected() {
    let mut books = Books::new();
    let invoice = books.invoice(TransactionKind::Pi, "202001", 1, dec!(10), dec!(2));
    LedgerService::void(&mut books.ledger, invoice.header.id).unwrap();
    let err = LedgerService::void(&mut books.ledger, invoice.header.id).unwrap_err();
    assert_eq!(err.error_code(), "ALREADY_VOID");
}

#[test]
fn test_void_payment_removes_cash_book_entry() {
    let mut books = Books::new();
    let payment = books
        .payment(TransactionKind::Pp, dec!(75), "202001", vec![])
        .unwrap();
    assert!(payment.cash_book.is_some());

    LedgerService::void(&mut books.ledger, payment.header.id).unwrap();

    assert_eq!(books.ledger.state().all_cash_book_entries().count(), 0);
}

// ============================================================================
// Suspense fallback
// ============================================================================

#[test]
fn test_unresolvable_vat_account_posts_to_suspense() {
    let config = LedgerConfig {
        vat_account: "Renamed Vat".into(),
        ..LedgerConfig::default()
    };
    let mut chart = AccountDirectory::new(&config.suspense_account);
    chart.add("Purchases");
    chart.add(&config.purchase_control_account);
    let mut books = Books::with_chart(chart, config);

    let invoice = books.invoice(TransactionKind::Pi, "202001", 1, dec!(100), dec!(20));

    let vat = invoice
        .postings
        .iter()
        .find(|p| p.component == Component::Vat)
        .unwrap();
    assert_eq!(vat.account, books.chart.suspense());
    assert_eq!(vat.value, dec!(20));
}

// ============================================================================
// Line rules
// ============================================================================

#[test]
fn test_zeroing_a_line_is_rejected_before_write() {
    let mut books = Books::new();
    let invoice = books.invoice(TransactionKind::Pi, "202001", 2, dec!(100), dec!(20));
    let line_id = invoice.lines[1].id;

    let err = books
        .edit(&EditTransactionInput {
            header_id: invoice.header.id,
            header: books.header(TransactionKind::Pi, Decimal::ZERO, "202001"),
            lines: vec![LineInput {
                id: Some(line_id),
                ..books.line("Purchases", Decimal::ZERO, Decimal::ZERO)
            }],
            matches: vec![],
        })
        .unwrap_err();

    assert_eq!(err.violations(), &[Violation::ZeroLine { line_no: 2 }]);
    assert_eq!(
        err.violations()[0].to_string(),
        "Line 2: Goods and Vat cannot both be zero."
    );
    let stored = books.ledger.state().postings(invoice.header.id).unwrap();
    assert_eq!(stored.len(), 6);
}

#[test]
fn test_edit_round_trip_restores_postings() {
    let mut books = Books::new();
    let invoice = books.invoice(TransactionKind::Si, "202001", 1, dec!(100), dec!(20));
    let line_id = invoice.lines[0].id;

    for (goods, vat) in [(dec!(80), Decimal::ZERO), (dec!(100), dec!(20))] {
        books
            .edit(&EditTransactionInput {
                header_id: invoice.header.id,
                header: books.header(TransactionKind::Si, Decimal::ZERO, "202001"),
                lines: vec![LineInput {
                    id: Some(line_id),
                    ..books.line("Sales", goods, vat)
                }],
                matches: vec![],
            })
            .unwrap();
    }

    let mut before: Vec<_> = invoice
        .postings
        .iter()
        .map(|p| (p.component, p.account, p.value))
        .collect();
    let mut after: Vec<_> = books
        .ledger
        .state()
        .postings(invoice.header.id)
        .unwrap()
        .iter()
        .map(|p| (p.component, p.account, p.value))
        .collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);
    assert_eq!(after.iter().map(|p| p.2).sum::<Decimal>(), Decimal::ZERO);
}
