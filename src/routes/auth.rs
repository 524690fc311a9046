use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::audit::actions;
use crate::auth::{hash_password, verify_password, CurrentSession, Session, TokenService};
use crate::errors::EngineError;
use crate::models::asset::{SEED_BTC, SEED_ETH};
use crate::models::{Symbol, User};
use crate::money;
use crate::services::asset_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

fn user_to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        balance: money::format(user.balance),
    }
}

/// `/api/register` and `/api/login` — no auth middleware applied.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// `/api/logout` — requires the auth middleware's `User`/`CurrentSession`
/// extensions, so it's mounted alongside the other protected routes.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/logout", post(logout))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<AuthResponse>, EngineError> {
    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    if name.is_empty() {
        return Err(EngineError::Validation("name must not be empty".into()));
    }
    if !email.contains('@') {
        return Err(EngineError::Validation("invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(EngineError::Validation("password must be at least 8 characters".into()));
    }
    if payload.password != payload.password_confirmation {
        return Err(EngineError::Validation("password confirmation does not match".into()));
    }

    if User::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(EngineError::Validation("email already registered".into()));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| EngineError::Internal(e.to_string()))?;

    let mut tx = state.pool.begin().await?;
    let user = User::create(&mut tx, &name, &email, &password_hash)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                EngineError::Validation("email already registered".into())
            }
            _ => EngineError::Database(e),
        })?;
    asset_service::credit(&mut tx, user.id, Symbol::Btc, SEED_BTC.parse().expect("valid seed constant"))
        .await?;
    asset_service::credit(&mut tx, user.id, Symbol::Eth, SEED_ETH.parse().expect("valid seed constant"))
        .await?;
    tx.commit().await?;

    let session = Session::create(&state.pool, user.id).await?;
    let access_token = TokenService::issue(user.id, session.id, &state.jwt_secret);

    state
        .audit
        .log(Some(user.id), actions::USER_REGISTERED, "user", Some(user.id), None, None)
        .await;

    Ok(Json(AuthResponse { access_token, user: user_to_response(&user) }))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, EngineError> {
    let email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| EngineError::Validation("invalid email or password".into()))?;

    let valid = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| EngineError::Internal(e.to_string()))?;
    if !valid {
        return Err(EngineError::Validation("invalid email or password".into()));
    }

    let session = Session::create(&state.pool, user.id).await?;
    let access_token = TokenService::issue(user.id, session.id, &state.jwt_secret);

    state
        .audit
        .log(Some(user.id), actions::USER_LOGIN, "user", Some(user.id), None, None)
        .await;

    Ok(Json(AuthResponse { access_token, user: user_to_response(&user) }))
}

async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<serde_json::Value>, EngineError> {
    Session::revoke(&state.pool, session.0).await?;

    state
        .audit
        .log(Some(user.id), actions::USER_LOGOUT, "user", Some(user.id), None, None)
        .await;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
