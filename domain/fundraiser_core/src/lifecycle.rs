//! # Lifecycle
//!
//! The fundraiser status state machine and the checks guarding the
//! three-step creation wizard.
//!
//! | From       | Transition | To         | Performed by |
//! |------------|------------|------------|--------------|
//! | `pending`  | `Verify`   | `verified` | admin        |
//! | `pending`  | `Reject`   | `rejected` | admin        |
//! | `verified` | `Publish`  | `published`| superadmin   |
//!
//! Any other pair is an [`Error::InvalidTransition`]. Wizard steps two and
//! three only touch a fundraiser while it is still `pending`.

use serde::Deserialize;

use crate::rbac::Operation;
use crate::{AccountDetails, BasicDetails, Error, FundraiserStatus, Money, Result};

/// A reviewer-driven status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Verify,
    Reject,
    Publish,
}

impl Transition {
    /// The only status this transition may start from.
    pub fn from_status(&self) -> FundraiserStatus {
        match self {
            Transition::Verify | Transition::Reject => FundraiserStatus::Pending,
            Transition::Publish => FundraiserStatus::Verified,
        }
    }

    pub fn to_status(&self) -> FundraiserStatus {
        match self {
            Transition::Verify => FundraiserStatus::Verified,
            Transition::Reject => FundraiserStatus::Rejected,
            Transition::Publish => FundraiserStatus::Published,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Transition::Verify => Operation::Verify,
            Transition::Reject => Operation::Reject,
            Transition::Publish => Operation::Publish,
        }
    }

    /// Whether the reviewer's identity is stamped into `verifiedBy`.
    pub fn records_reviewer(&self) -> bool {
        matches!(self, Transition::Verify | Transition::Reject)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Transition::Verify => "verify",
            Transition::Reject => "reject",
            Transition::Publish => "publish",
        }
    }
}

impl FundraiserStatus {
    /// Next status after `transition`, or [`Error::InvalidTransition`].
    pub fn apply(self, transition: Transition) -> Result<FundraiserStatus> {
        if self == transition.from_status() {
            Ok(transition.to_status())
        } else {
            Err(Error::InvalidTransition {
                action: transition.verb(),
                from: self,
            })
        }
    }
}

/// Step one payload as submitted. Missing fields are reported by
/// [`validate_basic_details`] rather than by the JSON decoder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicDetailsDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target: Option<Money>,
}

/// Step three payload as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetailsDraft {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    #[serde(alias = "ifsc")]
    pub routing_code: Option<String>,
}

pub fn validate_basic_details(draft: BasicDetailsDraft) -> Result<BasicDetails> {
    let title = required(draft.title, "title")?;
    let description = required(draft.description, "description")?;
    let category = required(draft.category, "category")?;
    let target = draft.target.unwrap_or(Money::ZERO);
    if target.is_negative() {
        return Err(Error::Validation("target must not be negative".into()));
    }

    Ok(BasicDetails {
        title,
        description,
        category,
        target,
    })
}

pub fn validate_account_details(draft: AccountDetailsDraft) -> Result<AccountDetails> {
    Ok(AccountDetails {
        bank_name: required(draft.bank_name, "bankName")?,
        account_number: required(draft.account_number, "accountNumber")?,
        routing_code: required(draft.routing_code, "routingCode")?,
    })
}

/// Only the creator may run wizard steps on a fundraiser.
pub fn ensure_creator(creator_id: &str, caller_id: &str) -> Result<()> {
    if creator_id == caller_id {
        Ok(())
    } else {
        Err(Error::Unauthorized(
            "only the creator may modify this fundraiser".into(),
        ))
    }
}

/// Proofs and payout details may change only before review.
pub fn ensure_editable(status: FundraiserStatus, step: &'static str) -> Result<()> {
    if status == FundraiserStatus::Pending {
        Ok(())
    } else {
        Err(Error::InvalidTransition { action: step, from: status })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Validation(format!("{field} is required")))
}
