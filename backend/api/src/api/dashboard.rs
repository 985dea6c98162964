//! Review dashboard handler.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use fundraiser_core::ledger::DashboardStats;
use fundraiser_core::Operation;

use super::ApiState;
use crate::auth::AuthUser;
use crate::db;
use crate::errors::Result;

#[derive(Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

/// `GET /admin/dashboard`
pub async fn stats(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
) -> Result<Json<DashboardResponse>> {
    caller.require(Operation::ViewDashboard)?;
    let stats = db::dashboard_stats(&state.pool).await?;
    Ok(Json(DashboardResponse {
        success: true,
        stats,
    }))
}
