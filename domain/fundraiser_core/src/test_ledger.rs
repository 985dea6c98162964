use chrono::{Duration, Utc};

use crate::invariants::{assert_all_fundraiser_invariants, assert_deposit_invariant};
use crate::ledger::{
    ensure_accepting, ledger_total, prepare_donation, DonationDraft, StatusCounts,
    ANONYMOUS_DONOR, MAX_DONATION,
};
use crate::{CreatorSummary, BasicDetails, Donation, Error, Fundraiser, FundraiserStatus, Money};

fn published() -> Fundraiser {
    let now = Utc::now();
    Fundraiser {
        id: "f-1".to_string(),
        creator: CreatorSummary {
            id: "u-1".to_string(),
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
        },
        basic_details: BasicDetails {
            title: "Help Ana".to_string(),
            description: "Medical".to_string(),
            category: "Medical".to_string(),
            target: Money::from_cents(100_000),
        },
        status: FundraiserStatus::Published,
        proofs: Vec::new(),
        account_details: None,
        verified_by: Some("admin@x.com".to_string()),
        amount_raised: Money::ZERO,
        donations: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

fn draft(amount: Option<Money>) -> DonationDraft {
    DonationDraft {
        fundraiser_id: Some("f-1".to_string()),
        amount,
        donor_name: None,
        donor_email: None,
    }
}

/// Mirror of the storage layer's append-and-increment.
fn append(f: &mut Fundraiser, donation: Donation) {
    let before = f.amount_raised;
    f.amount_raised = before.checked_add(donation.amount).unwrap();
    assert_deposit_invariant(before, f.amount_raised, donation.amount);
    f.donations.push(donation);
}

#[test]
fn test_total_tracks_ledger_over_many_donations() {
    let mut f = published();
    let start = Utc::now();
    for i in 1..=25i64 {
        let (_, d) = prepare_donation(
            draft(Some(Money::from_cents(i * 10 + 1))),
            None,
            start + Duration::seconds(i),
        )
        .unwrap();
        append(&mut f, d);
        assert_all_fundraiser_invariants(&f);
    }
    assert_eq!(f.donations.len(), 25);
    assert_eq!(ledger_total(&f.donations), Some(f.amount_raised));
}

#[test]
fn test_non_positive_amounts_rejected() {
    for amount in [Some(Money::ZERO), Some(Money::from_cents(-500)), None] {
        let err = prepare_donation(draft(amount), None, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{amount:?} accepted");
    }
}

#[test]
fn test_oversized_amounts_rejected() {
    let (_, d) = prepare_donation(draft(Some(MAX_DONATION)), None, Utc::now()).unwrap();
    assert_eq!(d.amount, MAX_DONATION);

    let over = Money::from_cents(MAX_DONATION.cents() + 1);
    for amount in [Some(over), Some(Money::from_cents(i64::MAX))] {
        let err = prepare_donation(draft(amount), None, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{amount:?} accepted");
    }
}

#[test]
fn test_fundraiser_id_required() {
    let mut d = draft(Some(Money::from_cents(100)));
    d.fundraiser_id = Some("  ".to_string());
    assert_eq!(
        prepare_donation(d, None, Utc::now()).unwrap_err(),
        Error::Validation("fundraiserId is required".into())
    );
}

#[test]
fn test_donor_name_defaults() {
    let now = Utc::now();

    let (_, anon) = prepare_donation(draft(Some(Money::from_cents(100))), None, now).unwrap();
    assert_eq!(anon.donor_name, ANONYMOUS_DONOR);
    assert_eq!(anon.donor_email, None);

    let (_, known) =
        prepare_donation(draft(Some(Money::from_cents(100))), Some("bob@x.com"), now).unwrap();
    assert_eq!(known.donor_name, "bob@x.com");

    let mut named = draft(Some(Money::from_cents(100)));
    named.donor_name = Some("Carol".to_string());
    named.donor_email = Some("carol@x.com".to_string());
    let (id, named) = prepare_donation(named, Some("bob@x.com"), now).unwrap();
    assert_eq!(id, "f-1");
    assert_eq!(named.donor_name, "Carol");
    assert_eq!(named.donor_email.as_deref(), Some("carol@x.com"));
    assert_eq!(named.donated_at, now);
}

#[test]
fn test_only_published_fundraisers_accept_donations() {
    assert!(ensure_accepting(FundraiserStatus::Published).is_ok());
    for status in [
        FundraiserStatus::Pending,
        FundraiserStatus::Verified,
        FundraiserStatus::Rejected,
    ] {
        assert!(matches!(
            ensure_accepting(status),
            Err(Error::InvalidTransition { .. })
        ));
    }
}

#[test]
fn test_status_counts_total_every_status() {
    let counts = StatusCounts::from_pairs([
        (FundraiserStatus::Pending, 3),
        (FundraiserStatus::Published, 2),
        (FundraiserStatus::Rejected, 1),
    ]);
    assert_eq!(counts.pending, 3);
    assert_eq!(counts.verified, 0);
    assert_eq!(counts.published, 2);
    assert_eq!(counts.rejected, 1);
    assert_eq!(counts.total, 6);
}

#[test]
fn test_ledger_total_detects_overflow() {
    let now = Utc::now();
    let huge = Donation {
        amount: Money::from_cents(i64::MAX),
        donor_name: ANONYMOUS_DONOR.to_string(),
        donor_email: None,
        donated_at: now,
    };
    assert_eq!(ledger_total(&[huge.clone()]), Some(Money::from_cents(i64::MAX)));
    assert_eq!(ledger_total(&[huge.clone(), huge]), None);
}
