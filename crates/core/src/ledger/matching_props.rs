//! Property-based tests for the matching engine.
//!
//! Enumerates sign combinations of subject totals, counterpart balances and
//! edge values to pin down the direction of both allocation bounds.

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use tallybook_shared::types::{HeaderId, within_signed_range};

use super::fixtures::header;
use super::kind::TransactionKind;
use super::matching::{MatchInput, MatchPlan, MatchRole, MatchingEngine};
use super::types::Header;

/// Non-zero amounts from -5,000.00 to 5,000.00.
fn signed_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        (1i64..500_000i64).prop_map(|cents| Decimal::new(-cents, 2)),
    ]
}

fn role_strategy() -> impl Strategy<Value = MatchRole> {
    prop_oneof![Just(MatchRole::MatchedBy), Just(MatchRole::MatchedTo)]
}

fn find(plan: &MatchPlan, id: HeaderId) -> &Header {
    plan.headers
        .iter()
        .find(|h| h.id == id)
        .expect("header in plan")
}

fn paid_within_total(h: &Header) -> bool {
    h.amounts_consistent() && within_signed_range(h.paid, h.total)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A single edge is accepted exactly when both bounds hold, and then
    /// moves both balances by the edge value.
    #[test]
    fn prop_single_edge_bounds_and_symmetry(
        subject_total in signed_amount(),
        counterpart_total in signed_amount(),
        value in signed_amount(),
        role in role_strategy(),
    ) {
        let subject = header(TransactionKind::Pp, subject_total);
        let counterpart = header(TransactionKind::Pi, counterpart_total);
        let counterparts = HashMap::from([(counterpart.id, counterpart.clone())]);
        let input = MatchInput { counterpart: counterpart.id, role, value };

        let w = match role {
            MatchRole::MatchedBy => value,
            MatchRole::MatchedTo => -value,
        };
        let expected_ok = within_signed_range(-w, subject_total)
            && within_signed_range(w, counterpart_total);

        let result = MatchingEngine::plan(&subject, &[], &counterparts, &[input]);
        prop_assert_eq!(result.is_ok(), expected_ok);

        if let Ok(plan) = result {
            let s = find(&plan, subject.id);
            let c = find(&plan, counterpart.id);
            prop_assert_eq!(s.due, subject_total + w);
            prop_assert_eq!(c.due, counterpart_total - w);
            prop_assert!(paid_within_total(s));
            prop_assert!(paid_within_total(c));

            let edge = &plan.upserts[0];
            match role {
                MatchRole::MatchedBy => {
                    prop_assert_eq!(edge.matched_by, subject.id);
                    // matched_to loses v, matched_by gains v
                    prop_assert_eq!(c.due, counterpart.due - value);
                    prop_assert_eq!(s.due, subject.total + value);
                }
                MatchRole::MatchedTo => {
                    prop_assert_eq!(edge.matched_to, subject.id);
                    prop_assert_eq!(s.due, subject.due - value);
                    prop_assert_eq!(c.due, counterpart.total + value);
                }
            }
        }
    }

    /// Several counterparts at once: an accepted plan never leaves any
    /// header paid beyond its total or on the wrong side of zero.
    #[test]
    fn prop_accepted_plans_keep_balances_in_range(
        subject_total in signed_amount(),
        edges in prop::collection::vec((signed_amount(), signed_amount()), 1..5),
    ) {
        let subject = header(TransactionKind::Pp, subject_total);
        let mut counterparts = HashMap::new();
        let mut inputs = Vec::new();
        for (total, value) in edges {
            let c = header(TransactionKind::Pi, total);
            inputs.push(MatchInput { counterpart: c.id, role: MatchRole::MatchedBy, value });
            counterparts.insert(c.id, c);
        }

        if let Ok(plan) = MatchingEngine::plan(&subject, &[], &counterparts, &inputs) {
            prop_assert_eq!(plan.headers.len(), inputs.len() + 1);
            for h in &plan.headers {
                prop_assert!(paid_within_total(h));
            }
        }
    }

    /// Re-applying zero to every edge of an accepted plan restores every
    /// balance to its starting point.
    #[test]
    fn prop_zeroing_edges_restores_balances(
        (total_cents, value_cents) in (1i64..500_000i64)
            .prop_flat_map(|total| (Just(total), 1i64..=total)),
    ) {
        let total = Decimal::new(total_cents, 2);
        let value = Decimal::new(value_cents, 2);
        let subject = header(TransactionKind::Pp, -total);
        let counterpart = header(TransactionKind::Pi, total);
        let counterparts = HashMap::from([(counterpart.id, counterpart.clone())]);
        let input = MatchInput { counterpart: counterpart.id, role: MatchRole::MatchedBy, value };

        let plan = MatchingEngine::plan(&subject, &[], &counterparts, &[input.clone()])
            .expect("allocation within both totals");
        let matched_subject = find(&plan, subject.id).clone();
        let matched_counterpart = find(&plan, counterpart.id).clone();

        let counterparts = HashMap::from([(counterpart.id, matched_counterpart)]);
        let undo = MatchInput { value: Decimal::ZERO, ..input };
        let plan = MatchingEngine::plan(&matched_subject, &plan.upserts, &counterparts, &[undo])
            .expect("removal is always allowed");

        prop_assert_eq!(find(&plan, subject.id).due, subject.due);
        prop_assert_eq!(find(&plan, counterpart.id).due, counterpart.due);
        prop_assert!(plan.upserts.is_empty());
        prop_assert_eq!(plan.deletes.len(), 1);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bound_scenario_example() {
        let subject = header(TransactionKind::Pp, dec!(-2400));
        let counterpart = header(TransactionKind::Pi, dec!(2500));
        let counterparts = HashMap::from([(counterpart.id, counterpart.clone())]);

        let rejected = MatchingEngine::plan(
            &subject,
            &[],
            &counterparts,
            &[MatchInput {
                counterpart: counterpart.id,
                role: MatchRole::MatchedBy,
                value: dec!(2600),
            }],
        );
        assert!(rejected.is_err());

        let plan = MatchingEngine::plan(
            &subject,
            &[],
            &counterparts,
            &[MatchInput {
                counterpart: counterpart.id,
                role: MatchRole::MatchedBy,
                value: dec!(2400),
            }],
        )
        .unwrap();
        assert_eq!(find(&plan, counterpart.id).due, dec!(100));
    }
}
