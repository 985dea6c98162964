//! Axum REST API: shared state, router and response shapes.

mod accounts;
mod dashboard;
mod fundraisers;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Path, State},
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use fundraiser_core::Fundraiser;

use crate::auth::TokenKeys;
use crate::errors::{ApiError, Result};
use crate::payments::PaymentGateway;
use crate::storage::ProofStore;

pub struct ApiState {
    pub pool: SqlitePool,
    pub tokens: TokenKeys,
    pub proofs: ProofStore,
    pub payments: PaymentGateway,
}

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub msg: String,
}

#[derive(Serialize)]
pub struct FundraiserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub fundraiser: Fundraiser,
}

impl FundraiserResponse {
    fn new(fundraiser: Fundraiser) -> Self {
        FundraiserResponse {
            success: true,
            msg: None,
            fundraiser,
        }
    }

    fn with_msg(fundraiser: Fundraiser, msg: &str) -> Self {
        FundraiserResponse {
            success: true,
            msg: Some(msg.to_string()),
            fundraiser,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────

/// Build the full route table around `state`.
pub fn router(state: Arc<ApiState>, frontend_url: &str, max_upload_bytes: usize) -> Router {
    let cors = match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => {
            warn!(frontend_url, "Unparseable FRONTEND_URL, allowing any origin");
            CorsLayer::new().allow_origin(Any)
        }
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/proofs/*key", get(proof))
        // Accounts
        .route("/auth/signup", post(accounts::signup))
        .route("/auth/login", post(accounts::login))
        .route("/auth/change-password", post(accounts::change_password))
        .route("/admin/login", post(accounts::admin_login))
        .route("/users", get(accounts::list_users))
        .route("/users/me", get(accounts::me).put(accounts::update_me))
        .route("/users/:id/role", patch(accounts::change_role))
        // Review dashboard
        .route("/admin/dashboard", get(dashboard::stats))
        // Creation wizard
        .route("/fundraisers/step1", post(fundraisers::create))
        .route(
            "/fundraisers/step2",
            post(fundraisers::attach_proofs).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/fundraisers/step3", post(fundraisers::attach_payout_details))
        .route("/fundraisers/mine", get(fundraisers::mine))
        // Review workflow
        .route("/fundraisers/pending", get(fundraisers::pending))
        .route("/fundraisers/verify", post(fundraisers::verify))
        .route("/fundraisers/reject", post(fundraisers::reject))
        .route("/fundraisers/verified", get(fundraisers::verified))
        .route("/fundraisers/publish", post(fundraisers::publish))
        // Public discovery and donations
        .route("/fundraisers/published", get(fundraisers::published))
        .route("/fundraisers/published/:id", get(fundraisers::published_one))
        .route("/fundraisers/search", get(fundraisers::search))
        .route("/fundraisers/donate", post(fundraisers::donate))
        .route(
            "/fundraisers/create-payment-intent",
            post(fundraisers::create_payment_intent),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /proofs/*key`
///
/// Serves stored proof documents back under the public URL prefix.
async fn proof(
    State(state): State<Arc<ApiState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let (bytes, content_type) = state.proofs.get(&key).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
