use axum::extract::State;
use axum::{routing::get, Extension, Json, Router};
use serde::Serialize;

use crate::errors::EngineError;
use crate::models::{Asset, User};
use crate::money;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub symbol: String,
    pub amount: String,
    pub locked_amount: String,
    pub total_amount: String,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserView,
    pub balance: String,
    pub assets: Vec<AssetResponse>,
}

fn user_view(user: &User) -> UserView {
    UserView { id: user.id.to_string(), name: user.name.clone(), email: user.email.clone() }
}

/// `/api/me` and `/api/profile` — both require the auth middleware.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me)).route("/profile", get(get_profile))
}

async fn get_me(Extension(user): Extension<User>) -> Json<MeResponse> {
    Json(MeResponse { user: user_view(&user) })
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ProfileResponse>, EngineError> {
    let assets = Asset::get_all_for_user(&state.pool, user.id).await?;

    Ok(Json(ProfileResponse {
        balance: money::format(user.balance),
        user: user_view(&user),
        assets: assets
            .into_iter()
            .map(|a| AssetResponse {
                symbol: a.symbol.clone(),
                amount: money::format(a.amount),
                locked_amount: money::format(a.locked_amount),
                total_amount: money::format(a.amount),
            })
            .collect(),
    }))
}
