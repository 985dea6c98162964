//! Database row shapes and their conversion into domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use fundraiser_core::{
    AccountDetails, BasicDetails, CreatorSummary, Donation, Fundraiser, Money, Role,
};

use crate::errors::{ApiError, Result};

/// A stored account. Never serialized directly: the hash stays server-side.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(u: &User) -> Self {
        UserProfile {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = ApiError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            role: row
                .role
                .parse()
                .map_err(|e| ApiError::Internal(format!("user {}: {e}", row.id)))?,
            created_at: from_millis(row.created_at)?,
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
        })
    }
}

/// A fundraiser joined with its creator's display identity.
#[derive(Debug, sqlx::FromRow)]
pub struct FundraiserRow {
    pub id: String,
    pub creator_id: String,
    pub creator_name: String,
    pub creator_email: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub target_cents: i64,
    pub status: String,
    pub proofs: String,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub routing_code: Option<String>,
    pub verified_by: Option<String>,
    pub amount_raised_cents: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl FundraiserRow {
    pub fn into_fundraiser(self, donations: Vec<Donation>) -> Result<Fundraiser> {
        let account_details = match (self.bank_name, self.account_number, self.routing_code) {
            (Some(bank_name), Some(account_number), Some(routing_code)) => Some(AccountDetails {
                bank_name,
                account_number,
                routing_code,
            }),
            _ => None,
        };

        Ok(Fundraiser {
            status: self
                .status
                .parse()
                .map_err(|e| ApiError::Internal(format!("fundraiser {}: {e}", self.id)))?,
            proofs: serde_json::from_str(&self.proofs)?,
            creator: CreatorSummary {
                id: self.creator_id,
                name: self.creator_name,
                email: self.creator_email,
            },
            basic_details: BasicDetails {
                title: self.title,
                description: self.description,
                category: self.category,
                target: Money::from_cents(self.target_cents),
            },
            account_details,
            verified_by: self.verified_by,
            amount_raised: Money::from_cents(self.amount_raised_cents),
            donations,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
            id: self.id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct DonationRow {
    pub fundraiser_id: String,
    pub amount_cents: i64,
    pub donor_name: String,
    pub donor_email: Option<String>,
    pub donated_at: i64,
}

impl TryFrom<DonationRow> for Donation {
    type Error = ApiError;

    fn try_from(row: DonationRow) -> Result<Self> {
        Ok(Donation {
            amount: Money::from_cents(row.amount_cents),
            donor_name: row.donor_name,
            donor_email: row.donor_email,
            donated_at: from_millis(row.donated_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct RecentDonationRow {
    pub fundraiser_id: String,
    pub fundraiser_title: String,
    pub amount_cents: i64,
    pub donor_name: String,
    pub donated_at: i64,
}

pub fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| ApiError::Internal(format!("timestamp out of range: {ms}")))
}
