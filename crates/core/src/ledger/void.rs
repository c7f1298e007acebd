//! Voiding: reverses a header's effect on the ledger while keeping the record.

use std::collections::BTreeMap;

use tallybook_shared::types::{HeaderId, MatchId};
use tracing::debug;

use super::error::LedgerError;
use super::types::{Header, HeaderStatus};
use crate::store::LedgerStore;

/// What a void removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidOutcome {
    /// The header after voiding.
    pub header: Header,
    /// Counterparts whose balances were restored.
    pub counterparts: Vec<Header>,
    /// Number of postings deleted.
    pub postings_removed: usize,
    /// Number of match edges deleted.
    pub matches_removed: usize,
}

/// Stateless void engine.
pub struct VoidEngine;

impl VoidEngine {
    /// Voids a header.
    ///
    /// Deletes its postings, VAT entries, cash book entries and match edges,
    /// gives every counterpart back the value its edge had allocated, clears
    /// the back-references of its lines and marks it void with nothing paid.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::HeaderNotFound`, `LedgerError::AlreadyVoid`, or a
    /// store error.
    pub fn void<S: LedgerStore + ?Sized>(
        store: &mut S,
        header_id: HeaderId,
    ) -> Result<VoidOutcome, LedgerError> {
        let mut header = store
            .header(header_id)?
            .ok_or(LedgerError::HeaderNotFound(header_id))?;
        if header.is_void() {
            return Err(LedgerError::AlreadyVoid(header_id));
        }

        let postings: Vec<_> = store.postings(header_id)?.iter().map(|p| p.id).collect();
        store.delete_postings(&postings)?;
        let vat: Vec<_> = store.vat_entries(header_id)?.iter().map(|v| v.id).collect();
        store.delete_vat_entries(&vat)?;
        let cash: Vec<_> = store
            .cash_book_entries(header_id)?
            .iter()
            .map(|c| c.id)
            .collect();
        store.delete_cash_book_entries(&cash)?;

        let edges = store.matches(header_id)?;
        let mut counterparts: BTreeMap<HeaderId, Header> = BTreeMap::new();
        for edge in &edges {
            let other = edge.other(header_id);
            if !counterparts.contains_key(&other) {
                let loaded = store
                    .header(other)?
                    .ok_or(LedgerError::HeaderNotFound(other))?;
                counterparts.insert(other, loaded);
            }
            if let Some(counterpart) = counterparts.get_mut(&other) {
                let due = if edge.matched_to == other {
                    counterpart.due + edge.value
                } else {
                    counterpart.due - edge.value
                };
                counterpart.set_due(due);
            }
        }
        let counterparts: Vec<Header> = counterparts.into_values().collect();
        store.update_headers(&counterparts)?;
        let edge_ids: Vec<MatchId> = edges.iter().map(|e| e.id).collect();
        store.delete_matches(&edge_ids)?;

        let mut lines = store.lines(header_id)?;
        for line in &mut lines {
            line.clear_refs();
        }
        store.update_lines(&lines)?;

        header.status = HeaderStatus::Void;
        header.set_due(header.total);
        store.update_headers(std::slice::from_ref(&header))?;

        debug!(
            header = %header_id,
            postings = postings.len(),
            matches = edge_ids.len(),
            "voided"
        );

        Ok(VoidOutcome {
            header,
            counterparts,
            postings_removed: postings.len(),
            matches_removed: edge_ids.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::{header, line};
    use crate::ledger::kind::TransactionKind;
    use crate::ledger::types::MatchEdge;
    use crate::store::LedgerState;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn edge(by: &Header, to: &Header, value: Decimal) -> MatchEdge {
        MatchEdge {
            id: MatchId::new(),
            matched_by: by.id,
            matched_to: to.id,
            value,
            period: by.period,
        }
    }

    #[test]
    fn test_void_restores_matched_by_counterpart() {
        let mut store = LedgerState::default();
        let mut invoice = header(TransactionKind::Si, dec!(2400));
        let mut receipt = header(TransactionKind::Sp, dec!(-600));
        invoice.set_due(dec!(1800));
        receipt.set_due(Decimal::ZERO);
        store.insert_header(invoice.clone()).unwrap();
        store.insert_header(receipt.clone()).unwrap();
        store
            .upsert_matches(&[edge(&receipt, &invoice, dec!(600))])
            .unwrap();

        let outcome = VoidEngine::void(&mut store, invoice.id).unwrap();

        assert_eq!(outcome.matches_removed, 1);
        let receipt = store.header(receipt.id).unwrap().unwrap();
        assert_eq!(receipt.due, dec!(-600));
        assert_eq!(receipt.paid, Decimal::ZERO);
        let invoice = store.header(invoice.id).unwrap().unwrap();
        assert!(invoice.is_void());
        assert_eq!(invoice.paid, Decimal::ZERO);
        assert_eq!(invoice.due, dec!(2400));
        assert!(store.matches(receipt.id).unwrap().is_empty());
    }

    #[test]
    fn test_void_restores_matched_to_counterpart() {
        let mut store = LedgerState::default();
        let mut payment = header(TransactionKind::Pp, dec!(-2400));
        let mut invoice = header(TransactionKind::Pi, dec!(2500));
        payment.set_due(Decimal::ZERO);
        invoice.set_due(dec!(100));
        store.insert_header(payment.clone()).unwrap();
        store.insert_header(invoice.clone()).unwrap();
        store
            .upsert_matches(&[edge(&payment, &invoice, dec!(2400))])
            .unwrap();

        VoidEngine::void(&mut store, payment.id).unwrap();

        let invoice = store.header(invoice.id).unwrap().unwrap();
        assert_eq!(invoice.due, dec!(2500));
        assert_eq!(invoice.paid, Decimal::ZERO);
    }

    #[test]
    fn test_void_clears_line_refs_and_keeps_lines() {
        let mut store = LedgerState::default();
        let h = header(TransactionKind::Pi, dec!(120));
        let mut l = line(&h, 1, dec!(100), dec!(20), None);
        l.goods_posting = Some(tallybook_shared::types::PostingId::new());
        store.insert_header(h.clone()).unwrap();
        store.insert_lines(&[l]).unwrap();

        VoidEngine::void(&mut store, h.id).unwrap();

        let lines = store.lines(h.id).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].goods_posting, None);
    }

    #[test]
    fn test_void_twice_fails() {
        let mut store = LedgerState::default();
        let h = header(TransactionKind::Pi, dec!(120));
        store.insert_header(h.clone()).unwrap();
        VoidEngine::void(&mut store, h.id).unwrap();
        assert!(matches!(
            VoidEngine::void(&mut store, h.id),
            Err(LedgerError::AlreadyVoid(id)) if id == h.id
        ));
    }

    #[test]
    fn test_void_unknown_header() {
        let mut store = LedgerState::default();
        assert!(matches!(
            VoidEngine::void(&mut store, HeaderId::new()),
            Err(LedgerError::HeaderNotFound(_))
        ));
    }
}
