//! Account handlers: sign-up, sign-in, profile and role management.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use fundraiser_core::{Operation, Role};

use super::{ApiJson, ApiState, MessageResponse};
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::{User, UserProfile};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserProfile>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}

fn valid_email(raw: Option<String>) -> Result<String> {
    let email = required(raw, "email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ApiError::Validation("email is not valid".to_string())),
    }
}

/// Look up the account and check the password. Unknown email and wrong
/// password are indistinguishable to the caller.
async fn authenticate(state: &ApiState, req: LoginRequest) -> Result<User> {
    let email = required(req.email, "email")?;
    let password = req.password.unwrap_or_default();

    let invalid = || ApiError::Authentication("Invalid credentials".to_string());
    let user = db::find_user_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&password, &user.password_hash)? {
        return Err(invalid());
    }
    Ok(user)
}

/// `POST /auth/signup`
pub async fn signup(
    State(state): State<Arc<ApiState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let name = required(req.name, "name")?;
    let email = valid_email(req.email)?;
    let password = required(req.password, "password")?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password_hash: hash_password(&password)?,
        role: Role::User,
        created_at: Utc::now(),
    };
    db::insert_user(&state.pool, &user).await?;
    info!(user_id = %user.id, "Account created");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            msg: Some("Signup successful".to_string()),
            user: UserProfile::from(&user),
        }),
    ))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<Arc<ApiState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = authenticate(&state, req).await?;
    let token = state.tokens.issue(&user)?;
    info!(user_id = %user.id, role = %user.role, "Signed in");
    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserProfile::from(&user),
    }))
}

/// `POST /admin/login`
///
/// Same as `/auth/login`, but only staff accounts get a token.
pub async fn admin_login(
    State(state): State<Arc<ApiState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = authenticate(&state, req).await?;
    if !user.role.is_staff() {
        return Err(ApiError::Authentication("Invalid credentials".to_string()));
    }
    let token = state.tokens.issue(&user)?;
    info!(user_id = %user.id, role = %user.role, "Staff signed in");
    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserProfile::from(&user),
    }))
}

/// `POST /auth/change-password`
pub async fn change_password(
    State(state): State<Arc<ApiState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let new_password = required(req.new_password, "newPassword")?;
    if let Some(current) = req.current_password {
        if !verify_password(&current, &user.password_hash)? {
            return Err(ApiError::Authentication(
                "Current password is incorrect".to_string(),
            ));
        }
    }

    db::update_password_hash(&state.pool, &user.id, &hash_password(&new_password)?).await?;
    info!(user_id = %user.id, "Password changed");
    Ok(Json(MessageResponse {
        success: true,
        msg: "Password changed successfully".to_string(),
    }))
}

/// `GET /users/me`
pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        msg: None,
        user: UserProfile::from(&user),
    })
}

/// `PUT /users/me`
///
/// Omitted fields keep their current value.
pub async fn update_me(
    State(state): State<Arc<ApiState>>,
    AuthUser(mut user): AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    if req.name.is_some() {
        user.name = required(req.name, "name")?;
    }
    if req.email.is_some() {
        user.email = valid_email(req.email)?;
    }
    db::update_user_profile(&state.pool, &user.id, &user.name, &user.email).await?;

    if let Some(password) = req.password.filter(|p| !p.trim().is_empty()) {
        db::update_password_hash(&state.pool, &user.id, &hash_password(&password)?).await?;
    }

    info!(user_id = %user.id, "Profile updated");
    Ok(Json(UserResponse {
        success: true,
        msg: None,
        user: UserProfile::from(&user),
    }))
}

/// `GET /users`
///
/// Every account except the caller's own.
pub async fn list_users(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
) -> Result<Json<UsersResponse>> {
    caller.require(Operation::ListUsers)?;
    let users = db::list_users_except(&state.pool, &caller.0.id).await?;
    Ok(Json(UsersResponse {
        users: users.iter().map(UserProfile::from).collect(),
    }))
}

/// `PATCH /users/:id/role`
pub async fn change_role(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ChangeRoleRequest>,
) -> Result<Json<UserResponse>> {
    caller.require(Operation::ChangeRole)?;

    let role = required(req.role, "role")?
        .parse::<Role>()
        .ok()
        .filter(Role::is_assignable)
        .ok_or_else(|| ApiError::Validation("Invalid role".to_string()))?;

    if !db::update_user_role(&state.pool, &id, role).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    let user = db::find_user_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(user_id = %user.id, role = %role, by = %caller.0.id, "Role changed");
    Ok(Json(UserResponse {
        success: true,
        msg: Some("User role updated".to_string()),
        user: UserProfile::from(&user),
    }))
}
