//! Matching engine: allocates one header's outstanding balance against others.
//!
//! An edge `matched_by -> matched_to` with value `v` reduces the due of
//! `matched_to` by `v` and adds `v` to the due of `matched_by`. Seen from a
//! subject header, an edge contributes `w = v` when the subject is
//! `matched_by` and `w = -v` when it is `matched_to`, so
//! `due(subject) = total(subject) + sum(w)`.
//!
//! Planning validates every rule and computes every new balance without
//! writing; applying writes the plan in one go.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallybook_shared::types::{ContactId, HeaderId, MatchId, within_signed_range};
use tracing::debug;

use super::error::{LedgerError, ValidationErrors, Violation};
use super::kind::Module;
use super::types::{Header, MatchEdge};
use crate::store::LedgerStore;

/// The subject's role on an edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MatchRole {
    /// Subject is `matched_by`.
    #[default]
    MatchedBy,
    /// Subject is `matched_to`; edits an edge created from the other side.
    MatchedTo,
}

/// A requested edge value between the subject and one counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInput {
    /// The other header.
    pub counterpart: HeaderId,
    /// The subject's role on the edge.
    #[serde(default)]
    pub role: MatchRole,
    /// Stored edge value; zero removes the edge.
    pub value: Decimal,
}

/// Validated changes ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPlan {
    /// Subject first, then every counterpart whose balance changed.
    pub headers: Vec<Header>,
    /// Edges to create or overwrite.
    pub upserts: Vec<MatchEdge>,
    /// Edges to remove.
    pub deletes: Vec<MatchId>,
}

impl MatchPlan {
    /// The subject header with its recomputed balance.
    #[must_use]
    pub fn subject(&self) -> Option<&Header> {
        self.headers.first()
    }
}

#[derive(Debug)]
struct EdgeState {
    existing: Option<MatchEdge>,
    value: Decimal,
    changed: bool,
}

impl EdgeState {
    fn old_value(&self) -> Decimal {
        self.existing.as_ref().map_or(Decimal::ZERO, |e| e.value)
    }
}

/// Signed contribution of an edge value to the subject's due.
fn weight(role: MatchRole, value: Decimal) -> Decimal {
    match role {
        MatchRole::MatchedBy => value,
        MatchRole::MatchedTo => -value,
    }
}

fn edge_key(subject: HeaderId, edge: &MatchEdge) -> (HeaderId, MatchRole) {
    if edge.matched_by == subject {
        (edge.matched_to, MatchRole::MatchedBy)
    } else {
        (edge.matched_by, MatchRole::MatchedTo)
    }
}

/// Stateless matching engine.
pub struct MatchingEngine;

impl MatchingEngine {
    /// Validates requested edge changes for `subject` and computes the new
    /// balances of every header involved.
    ///
    /// `subject` is the header as it will be after the current edit (its new
    /// total, period and contact). `existing` are the stored edges touching
    /// it; `counterparts` must hold every header on the other end of
    /// `existing` and `inputs`.
    ///
    /// All rule violations are collected before returning.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` with every violation found, or
    /// `LedgerError::HeaderNotFound` if a counterpart is missing.
    pub fn plan(
        subject: &Header,
        existing: &[MatchEdge],
        counterparts: &HashMap<HeaderId, Header>,
        inputs: &[MatchInput],
    ) -> Result<MatchPlan, LedgerError> {
        let mut violations = Vec::new();

        let mut edges: BTreeMap<(HeaderId, MatchRole), EdgeState> = existing
            .iter()
            .filter(|e| e.touches(subject.id))
            .map(|e| {
                (
                    edge_key(subject.id, e),
                    EdgeState {
                        existing: Some(e.clone()),
                        value: e.value,
                        changed: false,
                    },
                )
            })
            .collect();

        let mut seen = HashSet::new();
        let mut subject_reported = false;
        for input in inputs {
            if input.counterpart == subject.id {
                violations.push(Violation::SelfMatch);
                continue;
            }
            let key = (input.counterpart, input.role);
            if !seen.insert(key) {
                violations.push(Violation::DuplicateMatch {
                    counterpart: input.counterpart,
                });
                continue;
            }
            let counterpart = lookup(counterparts, input.counterpart)?;
            let old = edges.get(&key).map(EdgeState::old_value);
            if old == Some(input.value) || (old.is_none() && input.value.is_zero()) {
                continue;
            }

            if subject.module() == Module::CashBook && !subject_reported {
                subject_reported = true;
                violations.push(Violation::NotMatchable { header: subject.id });
            }
            if counterpart.module() == Module::CashBook {
                violations.push(Violation::NotMatchable {
                    header: counterpart.id,
                });
            }
            if counterpart.is_void() {
                violations.push(Violation::VoidCounterpart {
                    counterpart: counterpart.id,
                });
            }
            if counterpart.contact_id != subject.contact_id {
                violations.push(Violation::ContactMismatch {
                    counterpart: counterpart.id,
                });
            }
            if counterpart.module() != subject.module() {
                violations.push(Violation::ModuleMismatch {
                    counterpart: counterpart.id,
                });
            }
            if old.is_none() && counterpart.due.is_zero() {
                violations.push(Violation::NotOutstanding {
                    counterpart: counterpart.id,
                });
            }

            let state = edges.entry(key).or_insert(EdgeState {
                existing: None,
                value: Decimal::ZERO,
                changed: false,
            });
            state.value = input.value;
            state.changed = true;
        }

        // Period guard over every edge that survives, changed or not.
        for ((counterpart_id, role), state) in &edges {
            if state.value.is_zero() {
                continue;
            }
            let counterpart = lookup(counterparts, *counterpart_id)?;
            let (by, to) = match role {
                MatchRole::MatchedBy => (subject, counterpart),
                MatchRole::MatchedTo => (counterpart, subject),
            };
            if to.period > by.period {
                violations.push(Violation::PeriodOrder {
                    matched_by: by.id,
                    matched_by_period: by.period,
                    matched_to: to.id,
                    matched_to_period: to.period,
                });
            }
        }

        // Subject bound.
        let allocated: Decimal = edges
            .iter()
            .map(|((_, role), state)| weight(*role, state.value))
            .sum();
        let subject_due = subject.total + allocated;
        let subject_paid = subject.total - subject_due;
        if !within_signed_range(subject_paid, subject.total) {
            violations.push(Violation::SubjectBound {
                total: subject.total,
                paid: subject_paid,
            });
        }

        // Counterpart bounds, one per counterpart across its changed edges.
        let mut shifts: BTreeMap<HeaderId, (Decimal, Decimal)> = BTreeMap::new();
        for ((counterpart_id, role), state) in edges.iter().filter(|(_, s)| s.changed) {
            let shift = shifts.entry(*counterpart_id).or_default();
            shift.0 += weight(*role, state.old_value());
            shift.1 += weight(*role, state.value);
        }
        let mut updated_counterparts = Vec::with_capacity(shifts.len());
        for (counterpart_id, (old_weight, new_weight)) in shifts {
            let mut counterpart = lookup(counterparts, counterpart_id)?.clone();
            let headroom = counterpart.due + old_weight;
            if !within_signed_range(new_weight, headroom) {
                violations.push(Violation::CounterpartBound {
                    counterpart: counterpart_id,
                    value: new_weight,
                    headroom,
                });
            }
            counterpart.set_due(headroom - new_weight);
            updated_counterparts.push(counterpart);
        }

        if let Some(errors) = ValidationErrors::from_violations(violations) {
            return Err(errors.into());
        }

        let mut plan = MatchPlan::default();
        let mut updated_subject = subject.clone();
        updated_subject.set_due(subject_due);
        plan.headers.push(updated_subject);
        plan.headers.extend(updated_counterparts);

        for ((counterpart_id, role), state) in edges {
            if !state.changed {
                continue;
            }
            if state.value.is_zero() {
                if let Some(edge) = state.existing {
                    plan.deletes.push(edge.id);
                }
                continue;
            }
            let (matched_by, matched_to) = match role {
                MatchRole::MatchedBy => (subject.id, counterpart_id),
                MatchRole::MatchedTo => (counterpart_id, subject.id),
            };
            plan.upserts.push(MatchEdge {
                id: state.existing.map_or_else(MatchId::new, |e| e.id),
                matched_by,
                matched_to,
                value: state.value,
                period: subject.period,
            });
        }

        debug!(
            subject = %subject.id,
            upserts = plan.upserts.len(),
            deletes = plan.deletes.len(),
            "match plan ready"
        );
        Ok(plan)
    }

    /// Writes a validated plan: headers, then edge upserts and deletions.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the store fails.
    pub fn apply<S: LedgerStore + ?Sized>(store: &mut S, plan: &MatchPlan) -> Result<(), LedgerError> {
        store.update_headers(&plan.headers)?;
        store.upsert_matches(&plan.upserts)?;
        store.delete_matches(&plan.deletes)?;
        Ok(())
    }

    /// Loads every header at the other end of `existing` and `inputs`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::HeaderNotFound` if one does not exist.
    pub fn load_counterparts<S: LedgerStore + ?Sized>(
        store: &S,
        subject: HeaderId,
        existing: &[MatchEdge],
        inputs: &[MatchInput],
    ) -> Result<HashMap<HeaderId, Header>, LedgerError> {
        let ids: HashSet<HeaderId> = existing
            .iter()
            .map(|e| e.other(subject))
            .chain(inputs.iter().map(|i| i.counterpart))
            .filter(|id| *id != subject)
            .collect();
        ids.into_iter()
            .map(|id| {
                store
                    .header(id)?
                    .map(|h| (id, h))
                    .ok_or(LedgerError::HeaderNotFound(id))
            })
            .collect()
    }

    /// Applies match changes to a stored header on their own, outside of
    /// a header edit.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CannotModifyVoided` for a void subject, or any
    /// planning or store error.
    pub fn apply_matches<S: LedgerStore + ?Sized>(
        store: &mut S,
        subject: HeaderId,
        inputs: &[MatchInput],
    ) -> Result<MatchPlan, LedgerError> {
        let header = store
            .header(subject)?
            .ok_or(LedgerError::HeaderNotFound(subject))?;
        if header.is_void() {
            return Err(LedgerError::CannotModifyVoided(subject));
        }
        let existing = store.matches(subject)?;
        let counterparts = Self::load_counterparts(&*store, subject, &existing, inputs)?;
        let plan = Self::plan(&header, &existing, &counterparts, inputs)?;
        Self::apply(store, &plan)?;
        Ok(plan)
    }

    /// Rejects a contact change while the header has any edges.
    #[must_use]
    pub fn guard_contact_change(
        current: &Header,
        new_contact: ContactId,
        existing: &[MatchEdge],
    ) -> Option<Violation> {
        (current.contact_id != new_contact && existing.iter().any(|e| e.touches(current.id)))
            .then_some(Violation::ContactChangeWithMatches)
    }
}

fn lookup(counterparts: &HashMap<HeaderId, Header>, id: HeaderId) -> Result<&Header, LedgerError> {
    counterparts.get(&id).ok_or(LedgerError::HeaderNotFound(id))
}
