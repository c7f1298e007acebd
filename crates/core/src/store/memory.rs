//! In-memory record store.
//!
//! Commits by snapshot and swap: a unit of work runs against a clone of the
//! current state, which replaces the live state only when the work succeeds.

use std::collections::BTreeMap;

use tallybook_shared::types::{CashBookEntryId, HeaderId, LineId, MatchId, PostingId, VatEntryId};

use super::{LedgerStore, Transactional};
use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    CashBookEntry, Header, Line, MatchEdge, NewPosting, NewVatEntry, Posting, VatEntry,
};

/// All ledger records, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    headers: BTreeMap<HeaderId, Header>,
    lines: BTreeMap<LineId, Line>,
    postings: BTreeMap<PostingId, Posting>,
    vat_entries: BTreeMap<VatEntryId, VatEntry>,
    cash_book: BTreeMap<CashBookEntryId, CashBookEntry>,
    matches: BTreeMap<MatchId, MatchEdge>,
}

impl LedgerState {
    /// Every header.
    pub fn all_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers.values()
    }

    /// Every line.
    pub fn all_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    /// Every posting.
    pub fn all_postings(&self) -> impl Iterator<Item = &Posting> {
        self.postings.values()
    }

    /// Every VAT entry.
    pub fn all_vat_entries(&self) -> impl Iterator<Item = &VatEntry> {
        self.vat_entries.values()
    }

    /// Every cash book entry.
    pub fn all_cash_book_entries(&self) -> impl Iterator<Item = &CashBookEntry> {
        self.cash_book.values()
    }

    /// Every matching edge.
    pub fn all_matches(&self) -> impl Iterator<Item = &MatchEdge> {
        self.matches.values()
    }
}

fn overwrite<K: Ord + Copy + std::fmt::Display, V: Clone>(
    map: &mut BTreeMap<K, V>,
    records: &[V],
    key: impl Fn(&V) -> K,
    what: &str,
) -> Result<(), LedgerError> {
    for record in records {
        let id = key(record);
        match map.get_mut(&id) {
            Some(slot) => *slot = record.clone(),
            None => return Err(LedgerError::Store(format!("{what} {id} does not exist"))),
        }
    }
    Ok(())
}

impl LedgerStore for LedgerState {
    fn header(&self, id: HeaderId) -> Result<Option<Header>, LedgerError> {
        Ok(self.headers.get(&id).cloned())
    }

    fn insert_header(&mut self, header: Header) -> Result<(), LedgerError> {
        if self.headers.contains_key(&header.id) {
            return Err(LedgerError::Store(format!(
                "header {} already exists",
                header.id
            )));
        }
        self.headers.insert(header.id, header);
        Ok(())
    }

    fn update_headers(&mut self, headers: &[Header]) -> Result<(), LedgerError> {
        for header in headers {
            match self.headers.get_mut(&header.id) {
                Some(slot) => *slot = header.clone(),
                None => return Err(LedgerError::HeaderNotFound(header.id)),
            }
        }
        Ok(())
    }

    fn lines(&self, header_id: HeaderId) -> Result<Vec<Line>, LedgerError> {
        let mut lines: Vec<Line> = self
            .lines
            .values()
            .filter(|l| l.header_id == header_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.line_no);
        Ok(lines)
    }

    fn insert_lines(&mut self, lines: &[Line]) -> Result<(), LedgerError> {
        for line in lines {
            self.lines.insert(line.id, line.clone());
        }
        Ok(())
    }

    fn update_lines(&mut self, lines: &[Line]) -> Result<(), LedgerError> {
        overwrite(&mut self.lines, lines, |l| l.id, "line")
    }

    fn delete_lines(&mut self, ids: &[LineId]) -> Result<(), LedgerError> {
        for id in ids {
            self.lines.remove(id);
        }
        Ok(())
    }

    fn postings(&self, header_id: HeaderId) -> Result<Vec<Posting>, LedgerError> {
        Ok(self
            .postings
            .values()
            .filter(|p| p.header_id == header_id)
            .cloned()
            .collect())
    }

    fn insert_postings(&mut self, postings: Vec<NewPosting>) -> Result<Vec<Posting>, LedgerError> {
        let mut inserted: Vec<Posting> = postings
            .into_iter()
            .map(|p| p.with_id(PostingId::new()))
            .collect();
        for posting in &inserted {
            self.postings.insert(posting.id, posting.clone());
        }
        inserted.sort_by_key(|p| p.id);
        Ok(inserted)
    }

    fn update_postings(&mut self, postings: &[Posting]) -> Result<(), LedgerError> {
        overwrite(&mut self.postings, postings, |p| p.id, "posting")
    }

    fn delete_postings(&mut self, ids: &[PostingId]) -> Result<(), LedgerError> {
        for id in ids {
            self.postings.remove(id);
        }
        Ok(())
    }

    fn vat_entries(&self, header_id: HeaderId) -> Result<Vec<VatEntry>, LedgerError> {
        Ok(self
            .vat_entries
            .values()
            .filter(|v| v.header_id == header_id)
            .cloned()
            .collect())
    }

    fn insert_vat_entries(
        &mut self,
        entries: Vec<NewVatEntry>,
    ) -> Result<Vec<VatEntry>, LedgerError> {
        let mut inserted: Vec<VatEntry> = entries
            .into_iter()
            .map(|v| v.with_id(VatEntryId::new()))
            .collect();
        for entry in &inserted {
            self.vat_entries.insert(entry.id, entry.clone());
        }
        inserted.sort_by_key(|v| v.id);
        Ok(inserted)
    }

    fn update_vat_entries(&mut self, entries: &[VatEntry]) -> Result<(), LedgerError> {
        overwrite(&mut self.vat_entries, entries, |v| v.id, "vat entry")
    }

    fn delete_vat_entries(&mut self, ids: &[VatEntryId]) -> Result<(), LedgerError> {
        for id in ids {
            self.vat_entries.remove(id);
        }
        Ok(())
    }

    fn cash_book_entries(&self, header_id: HeaderId) -> Result<Vec<CashBookEntry>, LedgerError> {
        Ok(self
            .cash_book
            .values()
            .filter(|c| c.header_id == header_id)
            .cloned()
            .collect())
    }

    fn upsert_cash_book_entries(&mut self, entries: &[CashBookEntry]) -> Result<(), LedgerError> {
        for entry in entries {
            self.cash_book.insert(entry.id, entry.clone());
        }
        Ok(())
    }

    fn delete_cash_book_entries(&mut self, ids: &[CashBookEntryId]) -> Result<(), LedgerError> {
        for id in ids {
            self.cash_book.remove(id);
        }
        Ok(())
    }

    fn matches(&self, header_id: HeaderId) -> Result<Vec<MatchEdge>, LedgerError> {
        Ok(self
            .matches
            .values()
            .filter(|m| m.touches(header_id))
            .cloned()
            .collect())
    }

    fn upsert_matches(&mut self, edges: &[MatchEdge]) -> Result<(), LedgerError> {
        for edge in edges {
            self.matches.insert(edge.id, edge.clone());
        }
        Ok(())
    }

    fn delete_matches(&mut self, ids: &[MatchId]) -> Result<(), LedgerError> {
        for id in ids {
            self.matches.remove(id);
        }
        Ok(())
    }
}

/// Transactional in-memory ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: LedgerState,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed state.
    #[must_use]
    pub fn state(&self) -> &LedgerState {
        &self.state
    }
}

impl Transactional for InMemoryLedger {
    type Store = LedgerState;

    fn atomically<T, F>(&mut self, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Self::Store) -> Result<T, LedgerError>,
    {
        let mut snapshot = self.state.clone();
        let result = work(&mut snapshot)?;
        self.state = snapshot;
        Ok(result)
    }
}
