//! # Donation Ledger
//!
//! Each fundraiser owns an append-only sequence of [`Donation`]s paired
//! with a running total. This module decides what a donation looks like
//! before it is written; the storage layer appends the entry and bumps the
//! total as one atomic unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Donation, Error, FundraiserStatus, Money, Result};

/// Donor name recorded when neither a name nor a caller identity is known.
pub const ANONYMOUS_DONOR: &str = "Anonymous";

/// How many entries the dashboard shows in its recent-donations feed.
pub const RECENT_DONATIONS_LIMIT: i64 = 5;

/// Largest single donation accepted: 1,000,000,000.00.
pub const MAX_DONATION: Money = Money::from_cents(100_000_000_000);

/// Donation request as submitted by the public.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationDraft {
    pub fundraiser_id: Option<String>,
    pub amount: Option<Money>,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
}

/// Validate a donation request and stamp it with `now`.
///
/// `caller_email` is the authenticated donor's identity, if any; it names
/// the donor when the request does not.
pub fn prepare_donation(
    draft: DonationDraft,
    caller_email: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(String, Donation)> {
    let fundraiser_id = non_blank(draft.fundraiser_id)
        .ok_or_else(|| Error::Validation("fundraiserId is required".into()))?;
    let amount = require_positive(draft.amount)?;

    let donor_name = non_blank(draft.donor_name)
        .or_else(|| caller_email.map(str::to_string))
        .unwrap_or_else(|| ANONYMOUS_DONOR.to_string());

    Ok((
        fundraiser_id,
        Donation {
            amount,
            donor_name,
            donor_email: non_blank(draft.donor_email),
            donated_at: now,
        },
    ))
}

/// Amounts must be present, strictly positive and at most [`MAX_DONATION`].
pub fn require_positive(amount: Option<Money>) -> Result<Money> {
    match amount {
        Some(a) if a > MAX_DONATION => Err(Error::Validation(format!(
            "amount must not exceed {MAX_DONATION}"
        ))),
        Some(a) if a.is_positive() => Ok(a),
        Some(_) => Err(Error::Validation("amount must be greater than zero".into())),
        None => Err(Error::Validation("amount is required".into())),
    }
}

/// Only published campaigns accept money.
pub fn ensure_accepting(status: FundraiserStatus) -> Result<()> {
    if status == FundraiserStatus::Published {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            action: "donate to",
            from: status,
        })
    }
}

/// Sum of a ledger, `None` on overflow.
pub fn ledger_total(donations: &[Donation]) -> Option<Money> {
    donations
        .iter()
        .try_fold(Money::ZERO, |acc, d| acc.checked_add(d.amount))
}

/// Campaign counts per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub verified: i64,
    pub published: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (FundraiserStatus, i64)>) -> Self {
        let mut counts = StatusCounts::default();
        for (status, n) in pairs {
            match status {
                FundraiserStatus::Pending => counts.pending += n,
                FundraiserStatus::Verified => counts.verified += n,
                FundraiserStatus::Published => counts.published += n,
                FundraiserStatus::Rejected => counts.rejected += n,
            }
            counts.total += n;
        }
        counts
    }
}

/// One line of the system-wide recent-donations feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentDonation {
    pub fundraiser_id: String,
    pub fundraiser_title: String,
    pub amount: Money,
    pub donor_name: String,
    pub donated_at: DateTime<Utc>,
}

/// Aggregate statistics for the review dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub fundraisers: StatusCounts,
    pub total_donations: Money,
    pub total_users: i64,
    pub total_admins: i64,
    pub recent_donations: Vec<RecentDonation>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
