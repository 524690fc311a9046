use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use std::env;
use tower_http::cors::{Any, CorsLayer};

use exchange_core::audit::{AuditService, PostgresAuditSink};
use exchange_core::auth::{CurrentSession, Session, TokenService};
use exchange_core::config::Settings;
use exchange_core::events::create_event_service;
use exchange_core::models::User;
use exchange_core::routes::{auth, orders, profile};
use exchange_core::{db, scheduler, AppState};

#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exchange_core=debug".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let settings = Settings::load()?;

    tracing::info!("connecting to database...");
    let pool = db::create_pool(&settings.database_url).await?;

    tracing::info!("running migrations...");
    db::run_migrations(&pool).await?;

    scheduler::spawn_invariant_check_task(pool.clone());

    let audit = AuditService::new(PostgresAuditSink::new(pool.clone()));
    let events = create_event_service(settings.redis_url.as_deref());

    let state = AppState { pool, jwt_secret: settings.jwt_secret.clone(), audit, events };

    let public = Router::new().merge(auth::public_routes());

    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(profile::protected_routes())
        .merge(orders::protected_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", public.merge(protected))
        .layer(build_cors_layer())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("exchange_core listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use axum::http::Method;

    let allowed_methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let allowed_headers = [AUTHORIZATION, CONTENT_TYPE, ACCEPT];

    match env::var("CORS_ALLOWED_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    trimmed.parse().ok().or_else(|| {
                        tracing::warn!(origin = trimmed, "CORS_ALLOWED_ORIGINS entry is not a valid header value, skipping");
                        None
                    })
                })
                .collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(allowed_methods)
                .allow_headers(allowed_headers)
        }
        Err(_) => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers),
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "missing authorization header".into() }))
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "invalid authorization header".into() }))
    })?;

    let claims = TokenService::verify(token, &state.jwt_secret).ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "invalid or expired token".into() }))
    })?;

    let user_id: uuid::Uuid = claims
        .sub
        .parse()
        .map_err(|_| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "invalid token".into() })))?;
    let session_id: uuid::Uuid = claims
        .jti
        .parse()
        .map_err(|_| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "invalid token".into() })))?;

    let session_valid = Session::is_valid(&state.pool, session_id).await.map_err(|e| {
        tracing::error!("failed to check session: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: "internal error".into() }))
    })?;
    if !session_valid {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "session revoked or expired".into() })));
    }

    let user = User::find_by_id(&state.pool, user_id)
        .await
        .map_err(|e| {
            tracing::error!("failed to find user: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: "internal error".into() }))
        })?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "user not found".into() })))?;

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(CurrentSession(session_id));

    Ok(next.run(req).await)
}
