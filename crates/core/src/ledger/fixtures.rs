//! Builders shared by the ledger unit and property tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tallybook_shared::LedgerConfig;
use tallybook_shared::types::{AccountId, ContactId, HeaderId, LineId};

use super::accounts::{AccountDirectory, SystemAccounts};
use super::kind::TransactionKind;
use super::types::{Header, HeaderStatus, Line, VatCode};
use crate::fiscal::Period;

pub(crate) fn period(s: &str) -> Period {
    s.parse().unwrap()
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A cleared header with nothing paid; `total` is already signed.
pub(crate) fn header(kind: TransactionKind, total: Decimal) -> Header {
    Header {
        id: HeaderId::new(),
        kind,
        contact_id: ContactId::from_uuid(uuid::Uuid::nil()),
        reference: format!("{kind}-ref"),
        goods: total,
        vat: Decimal::ZERO,
        total,
        paid: Decimal::ZERO,
        due: total,
        date: date(2020, 1, 15),
        due_date: None,
        period: period("202001"),
        status: HeaderStatus::Cleared,
        bank_account: None,
        vat_direction: None,
    }
}

pub(crate) fn standard_rate() -> VatCode {
    VatCode {
        code: "S".to_string(),
        rate: Decimal::new(20, 0),
    }
}

/// A line with signed amounts and no references.
pub(crate) fn line(
    header: &Header,
    line_no: u32,
    goods: Decimal,
    vat: Decimal,
    account: Option<AccountId>,
) -> Line {
    Line {
        id: LineId::new(),
        header_id: header.id,
        line_no,
        description: format!("line {line_no}"),
        goods,
        vat,
        account,
        vat_code: Some(standard_rate()),
        goods_posting: None,
        vat_posting: None,
        total_posting: None,
        vat_entry: None,
    }
}

/// A chart with every default account present, plus `Purchases`, `Sales`
/// and `Bank`.
pub(crate) fn chart() -> AccountDirectory {
    let config = LedgerConfig::default();
    let mut chart = AccountDirectory::new(&config.suspense_account);
    chart.add(&config.vat_account);
    chart.add(&config.purchase_control_account);
    chart.add(&config.sales_control_account);
    chart.add("Purchases");
    chart.add("Sales");
    chart.add("Bank");
    chart
}

pub(crate) fn system_accounts(chart: &AccountDirectory) -> SystemAccounts {
    SystemAccounts::resolve(chart, &LedgerConfig::default())
}
