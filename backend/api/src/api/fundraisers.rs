//! Fundraiser handlers: the three-step creation wizard, the review
//! workflow, public discovery and donations.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use fundraiser_core::ledger::{ensure_accepting, prepare_donation, DonationDraft};
use fundraiser_core::lifecycle::{
    ensure_creator, ensure_editable, validate_account_details, validate_basic_details,
    AccountDetailsDraft, BasicDetailsDraft,
};
use fundraiser_core::search::{Listing, SearchQuery};
use fundraiser_core::{Fundraiser, Operation, Transition};

use super::{ApiJson, ApiState, FundraiserResponse};
use crate::auth::{AuthUser, MaybeUser};
use crate::db;
use crate::errors::{ApiError, Result};
use crate::payments::IntentMetadata;
use crate::storage::ProofFile;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundraiserRef {
    pub fundraiser_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub fundraiser_id: Option<String>,
    #[serde(flatten)]
    pub account: AccountDetailsDraft,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub fundraisers: Vec<Fundraiser>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

fn required_id(id: Option<String>) -> Result<String> {
    id.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("fundraiserId is required".to_string()))
}

fn not_found() -> ApiError {
    ApiError::NotFound("Fundraiser not found".to_string())
}

/// Load a fundraiser for a wizard step and check the caller owns it and
/// it is still open for edits.
async fn load_editable(
    state: &ApiState,
    id: &str,
    caller_id: &str,
    step: &'static str,
) -> Result<Fundraiser> {
    let fundraiser = db::get_fundraiser(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    ensure_creator(&fundraiser.creator.id, caller_id)?;
    ensure_editable(fundraiser.status, step)?;
    Ok(fundraiser)
}

// ─────────────────────────────────────────────────────────
// Creation wizard
// ─────────────────────────────────────────────────────────

/// `POST /fundraisers/step1`
pub async fn create(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ApiJson(draft): ApiJson<BasicDetailsDraft>,
) -> Result<Json<FundraiserResponse>> {
    caller.require(Operation::CreateFundraiser)?;
    let details = validate_basic_details(draft)?;

    let id = Uuid::new_v4().to_string();
    db::insert_fundraiser(&state.pool, &id, &caller.0.id, &details, Utc::now()).await?;
    info!(fundraiser_id = %id, creator = %caller.0.id, "Fundraiser created");

    let fundraiser = db::get_fundraiser(&state.pool, &id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(FundraiserResponse::new(fundraiser)))
}

/// `POST /fundraisers/step2`
///
/// Multipart body with a `fundraiserId` text field and one or more `proofs`
/// file fields. The stored proof list is replaced by this call's files.
pub async fn attach_proofs(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<FundraiserResponse>> {
    caller.require(Operation::AttachProofs)?;

    let mut fundraiser_id = None;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fundraiserId" => fundraiser_id = Some(field.text().await?),
            "proofs" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                files.push(ProofFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let id = required_id(fundraiser_id)?;
    if files.is_empty() {
        return Err(ApiError::Validation(
            "At least one proof file is required".to_string(),
        ));
    }
    load_editable(&state, &id, &caller.0.id, "attach proofs to").await?;

    let urls = state.proofs.put_all(&id, files).await?;
    if !db::replace_proofs(&state.pool, &id, &urls, Utc::now()).await? {
        warn!(fundraiser_id = %id, "Fundraiser left pending during proof upload");
        return Err(ApiError::Conflict(
            "Fundraiser is no longer pending".to_string(),
        ));
    }
    info!(fundraiser_id = %id, count = urls.len(), "Proofs attached");

    let fundraiser = db::get_fundraiser(&state.pool, &id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(FundraiserResponse::with_msg(
        fundraiser,
        "Proofs uploaded successfully",
    )))
}

/// `POST /fundraisers/step3`
pub async fn attach_payout_details(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ApiJson(req): ApiJson<PayoutRequest>,
) -> Result<Json<FundraiserResponse>> {
    caller.require(Operation::AttachPayoutDetails)?;
    let id = required_id(req.fundraiser_id)?;
    let account = validate_account_details(req.account)?;
    load_editable(&state, &id, &caller.0.id, "attach payout details to").await?;

    if !db::set_account_details(&state.pool, &id, &account, Utc::now()).await? {
        return Err(ApiError::Conflict(
            "Fundraiser is no longer pending".to_string(),
        ));
    }
    info!(fundraiser_id = %id, "Payout details attached");

    let fundraiser = db::get_fundraiser(&state.pool, &id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(FundraiserResponse::with_msg(
        fundraiser,
        "Fundraiser request submitted",
    )))
}

/// `GET /fundraisers/mine`
pub async fn mine(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
) -> Result<Json<Vec<Fundraiser>>> {
    caller.require(Operation::ListMine)?;
    Ok(Json(db::list_by_creator(&state.pool, &caller.0.id).await?))
}

// ─────────────────────────────────────────────────────────
// Review workflow
// ─────────────────────────────────────────────────────────

async fn list(
    state: &ApiState,
    caller: Option<&AuthUser>,
    listing: Listing,
) -> Result<Vec<Fundraiser>> {
    if let Some(op) = listing.operation() {
        let caller = caller
            .ok_or_else(|| ApiError::Authentication("Missing bearer token".to_string()))?;
        caller.require(op)?;
    }
    db::list_by_status(&state.pool, listing.status()).await
}

async fn transition(
    state: &ApiState,
    caller: &AuthUser,
    req: FundraiserRef,
    transition: Transition,
) -> Result<Fundraiser> {
    caller.require(transition.operation())?;
    let id = required_id(req.fundraiser_id)?;

    let fundraiser =
        db::apply_transition(&state.pool, &id, transition, &caller.0.email, Utc::now()).await?;
    info!(
        fundraiser_id = %id,
        status = %fundraiser.status,
        reviewer = %caller.0.email,
        action = transition.verb(),
        "Review transition applied"
    );
    Ok(fundraiser)
}

/// `GET /fundraisers/pending`
pub async fn pending(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
) -> Result<Json<Vec<Fundraiser>>> {
    Ok(Json(list(&state, Some(&caller), Listing::Pending).await?))
}

/// `GET /fundraisers/verified`
pub async fn verified(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
) -> Result<Json<Vec<Fundraiser>>> {
    Ok(Json(list(&state, Some(&caller), Listing::Verified).await?))
}

/// `POST /fundraisers/verify`
pub async fn verify(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ApiJson(req): ApiJson<FundraiserRef>,
) -> Result<Json<FundraiserResponse>> {
    let f = transition(&state, &caller, req, Transition::Verify).await?;
    Ok(Json(FundraiserResponse::with_msg(f, "Fundraiser verified")))
}

/// `POST /fundraisers/reject`
pub async fn reject(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ApiJson(req): ApiJson<FundraiserRef>,
) -> Result<Json<FundraiserResponse>> {
    let f = transition(&state, &caller, req, Transition::Reject).await?;
    Ok(Json(FundraiserResponse::with_msg(f, "Fundraiser rejected")))
}

/// `POST /fundraisers/publish`
pub async fn publish(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ApiJson(req): ApiJson<FundraiserRef>,
) -> Result<Json<FundraiserResponse>> {
    let f = transition(&state, &caller, req, Transition::Publish).await?;
    Ok(Json(FundraiserResponse::with_msg(f, "Fundraiser published")))
}

// ─────────────────────────────────────────────────────────
// Public discovery and donations
// ─────────────────────────────────────────────────────────

/// `GET /fundraisers/published`
pub async fn published(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<Fundraiser>>> {
    Ok(Json(list(&state, None, Listing::Published).await?))
}

/// `GET /fundraisers/published/:id`
pub async fn published_one(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Fundraiser>> {
    db::get_fundraiser(&state.pool, &id)
        .await?
        .filter(|f| f.status == Listing::Published.status())
        .map(Json)
        .ok_or_else(not_found)
}

/// `GET /fundraisers/search?query=`
///
/// A missing or blank query yields an empty list.
pub async fn search(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let fundraisers = match SearchQuery::parse(params.query.as_deref()) {
        Some(q) => db::search_published(&state.pool, &q).await?,
        None => Vec::new(),
    };
    Ok(Json(SearchResponse { fundraisers }))
}

/// `POST /fundraisers/donate`
pub async fn donate(
    State(state): State<Arc<ApiState>>,
    MaybeUser(caller): MaybeUser,
    ApiJson(draft): ApiJson<DonationDraft>,
) -> Result<Json<FundraiserResponse>> {
    let caller_email = caller.as_ref().map(|u| u.email.as_str());
    let (id, donation) = prepare_donation(draft, caller_email, Utc::now())?;

    let fundraiser = db::record_donation(&state.pool, &id, &donation).await?;
    info!(
        fundraiser_id = %id,
        amount = %donation.amount,
        raised = %fundraiser.amount_raised,
        "Donation recorded"
    );
    Ok(Json(FundraiserResponse::with_msg(
        fundraiser,
        "Donation successful",
    )))
}

/// `POST /fundraisers/create-payment-intent`
///
/// Authorizes a card charge for a later `donate` call. Only published
/// fundraisers can be paid into.
pub async fn create_payment_intent(
    State(state): State<Arc<ApiState>>,
    MaybeUser(caller): MaybeUser,
    ApiJson(draft): ApiJson<DonationDraft>,
) -> Result<Json<PaymentIntentResponse>> {
    let caller_email = caller.as_ref().map(|u| u.email.as_str());
    let (id, donation) = prepare_donation(draft, caller_email, Utc::now())?;

    let status = db::fundraiser_status(&state.pool, &id)
        .await?
        .ok_or_else(not_found)?;
    ensure_accepting(status)?;

    let metadata = IntentMetadata {
        fundraiser_id: Some(id),
        donor_name: Some(donation.donor_name),
        donor_email: donation.donor_email,
    };
    let client_secret = state.payments.create_intent(donation.amount, &metadata).await?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}
