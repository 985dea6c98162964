//! # Types
//!
//! Shared data structures of the fundraiser domain.
//!
//! ### Status as a Finite-State Machine
//!
//! [`FundraiserStatus`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Pending ──► Verified ──► Published
//!     └──► Rejected
//! ```
//!
//! `Published` and `Rejected` are terminal. The transition table lives in
//! [`crate::lifecycle`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Money};

/// Lifecycle status of a fundraiser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundraiserStatus {
    /// Submitted, awaiting admin review.
    Pending,
    /// Authenticity confirmed by an admin; awaiting publication.
    Verified,
    /// Publicly discoverable and accepting donations.
    Published,
    /// Turned down by an admin.
    Rejected,
}

impl FundraiserStatus {
    pub const ALL: [FundraiserStatus; 4] = [
        FundraiserStatus::Pending,
        FundraiserStatus::Verified,
        FundraiserStatus::Published,
        FundraiserStatus::Rejected,
    ];

    /// Identifier used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Rejected)
    }
}

impl fmt::Display for FundraiserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundraiserStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::Validation(format!("unknown fundraiser status {other:?}"))),
        }
    }
}

/// Campaign details collected by the first wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicDetails {
    pub title: String,
    pub description: String,
    pub category: String,
    pub target: Money,
}

/// Payout bank reference collected by the third wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: String,
}

/// One entry of a fundraiser's append-only donation ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub amount: Money,
    pub donor_name: String,
    pub donor_email: Option<String>,
    pub donated_at: DateTime<Utc>,
}

/// Minimal creator identity joined onto listings for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A campaign record with its embedded donation ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundraiser {
    pub id: String,
    /// Set once at creation, never reassigned.
    pub creator: CreatorSummary,
    pub basic_details: BasicDetails,
    pub status: FundraiserStatus,
    pub proofs: Vec<String>,
    pub account_details: Option<AccountDetails>,
    pub verified_by: Option<String>,
    /// Always equal to the sum of `donations[].amount`.
    pub amount_raised: Money,
    pub donations: Vec<Donation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
