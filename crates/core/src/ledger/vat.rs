//! VAT register entries for analysed lines.
//!
//! One entry per line carrying a vat code. Entries are regenerated from the
//! line on every edit rather than diffed field by field.

use std::collections::HashMap;

use tallybook_shared::types::{LineId, VatEntryId};
use tracing::debug;

use super::error::LedgerError;
use super::kind::{Module, TransactionKind};
use super::posting::LineEdits;
use super::types::{Header, Line, NewVatEntry, VatDirection, VatEntry};
use crate::store::LedgerStore;

/// Stateless VAT engine.
pub struct VatEngine;

impl VatEngine {
    /// Direction of the VAT carried by `header`.
    ///
    /// Purchases are input, sales output; cash book headers choose, with
    /// payments defaulting to input and receipts to output.
    #[must_use]
    pub fn direction(header: &Header) -> VatDirection {
        match header.module() {
            Module::Purchases => VatDirection::Input,
            Module::Sales => VatDirection::Output,
            Module::CashBook => header.vat_direction.unwrap_or(match header.kind {
                TransactionKind::Cr | TransactionKind::Cbr => VatDirection::Output,
                _ => VatDirection::Input,
            }),
        }
    }

    /// Creates VAT entries for new lines and links them back.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the store fails.
    pub fn post<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        lines: &mut [Line],
    ) -> Result<Vec<VatEntry>, LedgerError> {
        let batch: Vec<NewVatEntry> = lines
            .iter()
            .filter_map(|line| Self::entry_for(header, line))
            .collect();
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let inserted = store.insert_vat_entries(batch)?;
        link_vat_refs(lines, &inserted);
        store.update_lines(lines)?;
        Ok(inserted)
    }

    /// Brings VAT entries up to date after an edit.
    ///
    /// An entry is dropped when its line loses its vat code or is deleted,
    /// created when a code is newly set, and otherwise overwritten.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the store fails.
    pub fn repost<S: LedgerStore + ?Sized>(
        store: &mut S,
        header: &Header,
        edits: &mut LineEdits,
    ) -> Result<Vec<VatEntry>, LedgerError> {
        let existing: HashMap<LineId, VatEntryId> = store
            .vat_entries(header.id)?
            .into_iter()
            .map(|v| (v.line_id, v.id))
            .collect();

        let mut deletes: Vec<VatEntryId> = edits
            .deleted
            .iter()
            .filter_map(|line| existing.get(&line.id).copied())
            .collect();
        let mut updates = Vec::new();
        let mut creates = Vec::new();

        for line in edits.retained.iter_mut().chain(edits.new.iter_mut()) {
            match (existing.get(&line.id).copied(), Self::entry_for(header, line)) {
                (Some(id), Some(entry)) => {
                    updates.push(entry.with_id(id));
                    line.vat_entry = Some(id);
                }
                (Some(id), None) => {
                    deletes.push(id);
                    line.vat_entry = None;
                }
                (None, Some(entry)) => creates.push(entry),
                (None, None) => line.vat_entry = None,
            }
        }

        debug!(
            header = %header.id,
            updated = updates.len(),
            deleted = deletes.len(),
            created = creates.len(),
            "reposting vat entries"
        );

        store.update_vat_entries(&updates)?;
        store.delete_vat_entries(&deletes)?;
        let inserted = store.insert_vat_entries(creates)?;
        link_vat_refs(&mut edits.retained, &inserted);
        link_vat_refs(&mut edits.new, &inserted);
        store.update_lines(&edits.retained)?;
        store.update_lines(&edits.new)?;

        updates.extend(inserted);
        Ok(updates)
    }

    fn entry_for(header: &Header, line: &Line) -> Option<NewVatEntry> {
        let code = line.vat_code.as_ref()?;
        Some(NewVatEntry {
            module: header.module(),
            header_id: header.id,
            line_id: line.id,
            line_no: line.line_no,
            vat_code: code.code.clone(),
            vat_rate: code.rate,
            goods: line.goods,
            vat: line.vat,
            reference: header.reference.clone(),
            period: header.period,
            date: header.date,
            kind: header.kind,
            direction: Self::direction(header),
        })
    }
}

fn link_vat_refs(lines: &mut [Line], inserted: &[VatEntry]) {
    let by_line: HashMap<LineId, VatEntryId> =
        inserted.iter().map(|v| (v.line_id, v.id)).collect();
    for line in lines {
        if let Some(id) = by_line.get(&line.id) {
            line.vat_entry = Some(*id);
        }
    }
}
