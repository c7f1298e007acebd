//! Record store port.
//!
//! The engines read and write through [`LedgerStore`]; [`Transactional`]
//! wraps one create, edit or void in an all-or-nothing unit of work.
//! Batch inserts return records in the store's own order, which callers
//! must not assume matches the order they were submitted in.

pub mod memory;

use tallybook_shared::types::{CashBookEntryId, HeaderId, LineId, MatchId, PostingId, VatEntryId};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    CashBookEntry, Header, Line, MatchEdge, NewPosting, NewVatEntry, Posting, VatEntry,
};

pub use memory::{InMemoryLedger, LedgerState};

/// Reads and writes of ledger records.
pub trait LedgerStore {
    // ========== Headers ==========
    /// Fetches one header.
    fn header(&self, id: HeaderId) -> Result<Option<Header>, LedgerError>;
    /// Stores a new header.
    fn insert_header(&mut self, header: Header) -> Result<(), LedgerError>;
    /// Overwrites existing headers.
    fn update_headers(&mut self, headers: &[Header]) -> Result<(), LedgerError>;

    // ========== Lines ==========
    /// Lines of a header ordered by line number.
    fn lines(&self, header_id: HeaderId) -> Result<Vec<Line>, LedgerError>;
    /// Stores new lines.
    fn insert_lines(&mut self, lines: &[Line]) -> Result<(), LedgerError>;
    /// Overwrites existing lines.
    fn update_lines(&mut self, lines: &[Line]) -> Result<(), LedgerError>;
    /// Deletes lines.
    fn delete_lines(&mut self, ids: &[LineId]) -> Result<(), LedgerError>;

    // ========== Postings ==========
    /// Postings of a header.
    fn postings(&self, header_id: HeaderId) -> Result<Vec<Posting>, LedgerError>;
    /// Stores new postings, assigning identifiers.
    fn insert_postings(&mut self, postings: Vec<NewPosting>) -> Result<Vec<Posting>, LedgerError>;
    /// Overwrites existing postings.
    fn update_postings(&mut self, postings: &[Posting]) -> Result<(), LedgerError>;
    /// Deletes postings.
    fn delete_postings(&mut self, ids: &[PostingId]) -> Result<(), LedgerError>;

    // ========== VAT ==========
    /// VAT entries of a header.
    fn vat_entries(&self, header_id: HeaderId) -> Result<Vec<VatEntry>, LedgerError>;
    /// Stores new VAT entries, assigning identifiers.
    fn insert_vat_entries(
        &mut self,
        entries: Vec<NewVatEntry>,
    ) -> Result<Vec<VatEntry>, LedgerError>;
    /// Overwrites existing VAT entries.
    fn update_vat_entries(&mut self, entries: &[VatEntry]) -> Result<(), LedgerError>;
    /// Deletes VAT entries.
    fn delete_vat_entries(&mut self, ids: &[VatEntryId]) -> Result<(), LedgerError>;

    // ========== Cash book ==========
    /// Cash book entries of a header.
    fn cash_book_entries(&self, header_id: HeaderId) -> Result<Vec<CashBookEntry>, LedgerError>;
    /// Stores or overwrites cash book entries.
    fn upsert_cash_book_entries(&mut self, entries: &[CashBookEntry]) -> Result<(), LedgerError>;
    /// Deletes cash book entries.
    fn delete_cash_book_entries(&mut self, ids: &[CashBookEntryId]) -> Result<(), LedgerError>;

    // ========== Matching ==========
    /// Edges where the header is either endpoint.
    fn matches(&self, header_id: HeaderId) -> Result<Vec<MatchEdge>, LedgerError>;
    /// Stores or overwrites edges.
    fn upsert_matches(&mut self, edges: &[MatchEdge]) -> Result<(), LedgerError>;
    /// Deletes edges.
    fn delete_matches(&mut self, ids: &[MatchId]) -> Result<(), LedgerError>;
}

/// A store that can run work atomically.
pub trait Transactional {
    /// Store handle visible inside the unit of work.
    type Store: LedgerStore;

    /// Runs `work`; its writes become visible only if it returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns, with nothing committed.
    fn atomically<T, F>(&mut self, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Self::Store) -> Result<T, LedgerError>;
}
