#![allow(dead_code)]

use crate::ledger::ledger_total;
use crate::{Fundraiser, FundraiserStatus, Money};

/// The running total always equals the sum of the ledger.
pub fn assert_total_matches_ledger(fundraiser: &Fundraiser) {
    let sum = ledger_total(&fundraiser.donations).expect("ledger overflow");
    assert_eq!(
        fundraiser.amount_raised, sum,
        "fundraiser {} reports {} raised but its ledger sums to {}",
        fundraiser.id, fundraiser.amount_raised, sum
    );
}

/// Every ledger entry carries a positive amount.
pub fn assert_donations_positive(fundraiser: &Fundraiser) {
    for (i, d) in fundraiser.donations.iter().enumerate() {
        assert!(
            d.amount.is_positive(),
            "fundraiser {} has non-positive donation #{i}: {}",
            fundraiser.id,
            d.amount
        );
    }
}

/// Ledger entries are kept in insertion (timestamp) order.
pub fn assert_ledger_ordered(fundraiser: &Fundraiser) {
    for pair in fundraiser.donations.windows(2) {
        assert!(
            pair[0].donated_at <= pair[1].donated_at,
            "fundraiser {} ledger out of order",
            fundraiser.id
        );
    }
}

/// After a donation of `amount`, the total grows by exactly `amount`.
pub fn assert_deposit_invariant(before: Money, after: Money, amount: Money) {
    assert_eq!(
        Some(after),
        before.checked_add(amount),
        "donation of {amount} moved total from {before} to {after}"
    );
}

/// Only the forward edges of the lifecycle are legal.
pub fn assert_valid_status_transition(from: FundraiserStatus, to: FundraiserStatus) {
    let valid = matches!(
        (from, to),
        (FundraiserStatus::Pending, FundraiserStatus::Verified)
            | (FundraiserStatus::Pending, FundraiserStatus::Rejected)
            | (FundraiserStatus::Verified, FundraiserStatus::Published)
    );
    assert!(valid, "invalid status transition from {from} to {to}");
}

/// Fields fixed at creation never change.
pub fn assert_immutable_fields(original: &Fundraiser, current: &Fundraiser) {
    assert_eq!(original.id, current.id, "fundraiser id changed");
    assert_eq!(original.creator, current.creator, "fundraiser creator changed");
    assert_eq!(original.created_at, current.created_at, "creation time changed");
}

/// Run all stateless fundraiser invariants.
pub fn assert_all_fundraiser_invariants(fundraiser: &Fundraiser) {
    assert_total_matches_ledger(fundraiser);
    assert_donations_positive(fundraiser);
    assert_ledger_ordered(fundraiser);
}
