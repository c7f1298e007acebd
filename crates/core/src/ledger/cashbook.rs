//! Cash book entries for headers that move money through a bank account.

use tallybook_shared::types::CashBookEntryId;

use super::error::LedgerError;
use super::posting::PostingStrategy;
use super::types::{CashBookEntry, Header};
use crate::store::LedgerStore;

/// Stateless cash book engine.
pub struct CashBookEngine;

impl CashBookEngine {
    /// Makes the header's cash book entry mirror its bank-side postings.
    ///
    /// Creates the entry when missing, overwrites it when present and removes
    /// it once the bank value is zero or the header no longer touches a bank.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the store fails.
    pub fn sync<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
    ) -> Result<Option<CashBookEntry>, LedgerError> {
        let existing = store.cash_book_entries(header.id)?;
        let wanted = PostingStrategy::for_kind(header.kind)
            .bank_value(header)
            .filter(|value| !value.is_zero())
            .zip(header.bank_account);

        let Some((value, account)) = wanted else {
            let ids: Vec<CashBookEntryId> = existing.iter().map(|e| e.id).collect();
            store.delete_cash_book_entries(&ids)?;
            return Ok(None);
        };

        let mut entries = existing.into_iter();
        let id = entries.next().map_or_else(CashBookEntryId::new, |e| e.id);
        let extras: Vec<CashBookEntryId> = entries.map(|e| e.id).collect();
        store.delete_cash_book_entries(&extras)?;

        let entry = CashBookEntry {
            id,
            header_id: header.id,
            account,
            value,
            reference: header.reference.clone(),
            period: header.period,
            date: header.date,
            kind: header.kind,
        };
        store.upsert_cash_book_entries(std::slice::from_ref(&entry))?;
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::header;
    use crate::ledger::kind::TransactionKind;
    use crate::store::LedgerState;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tallybook_shared::types::AccountId;

    #[test]
    fn test_payment_creates_then_updates_then_removes_entry() {
        let mut store = LedgerState::default();
        let mut h = header(TransactionKind::Pp, dec!(-500));
        h.bank_account = Some(AccountId::new());

        let created = CashBookEngine::sync(&mut store, &h).unwrap().unwrap();
        assert_eq!(created.value, dec!(-500));

        h.total = dec!(-700);
        h.reference = "changed".to_string();
        let updated = CashBookEngine::sync(&mut store, &h).unwrap().unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.value, dec!(-700));
        assert_eq!(store.cash_book_entries(h.id).unwrap(), vec![updated]);

        h.total = Decimal::ZERO;
        assert!(CashBookEngine::sync(&mut store, &h).unwrap().is_none());
        assert!(store.cash_book_entries(h.id).unwrap().is_empty());
    }

    #[test]
    fn test_invoice_has_no_cash_book_entry() {
        let mut store = LedgerState::default();
        let mut h = header(TransactionKind::Pi, dec!(120));
        h.bank_account = Some(AccountId::new());
        assert!(CashBookEngine::sync(&mut store, &h).unwrap().is_none());
    }

    #[test]
    fn test_cash_book_receipt_entry_is_money_in() {
        let mut store = LedgerState::default();
        let mut h = header(TransactionKind::Cr, dec!(240));
        h.bank_account = Some(AccountId::new());
        let entry = CashBookEngine::sync(&mut store, &h).unwrap().unwrap();
        assert_eq!(entry.value, dec!(240));
    }
}
