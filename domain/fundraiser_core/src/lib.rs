//! # Fundraiser Core
//!
//! Domain rules of the crowdfunding service, free of any I/O. The REST
//! service in `backend/api` persists what this crate decides.
//!
//! | Phase        | Entry Point(s)                                         |
//! |--------------|--------------------------------------------------------|
//! | Capabilities | [`rbac::require`], [`Operation::allowed_roles`]        |
//! | Registration | [`lifecycle::validate_basic_details`]                  |
//! | Wizard steps | [`lifecycle::ensure_editable`], [`lifecycle::validate_account_details`] |
//! | Review       | [`FundraiserStatus::apply`]                            |
//! | Funding      | [`ledger::prepare_donation`], [`ledger::ledger_total`] |
//! | Queries      | [`search::SearchQuery`], [`search::Listing`]           |
//!
//! ## Architecture
//!
//! Authorization is fully described by [`rbac`]: every operation carries an
//! explicit set of permitted roles. The status state machine lives in
//! [`lifecycle`], and amounts are always [`Money`] (integer minor units) so
//! the running total of a fundraiser never drifts from its ledger.

mod money;
mod types;

pub mod ledger;
pub mod lifecycle;
pub mod rbac;
pub mod search;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_ledger;
#[cfg(test)]
mod test_lifecycle;

pub use lifecycle::Transition;
pub use money::Money;
pub use rbac::{Operation, Role};
pub use types::{AccountDetails, BasicDetails, CreatorSummary, Donation, Fundraiser, FundraiserStatus};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The caller's role or ownership does not permit the operation.
    #[error("{0}")]
    Unauthorized(String),

    /// The fundraiser's current status does not allow the transition.
    #[error("cannot {action} a fundraiser that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: FundraiserStatus,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
