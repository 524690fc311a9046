pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod models;
pub mod money;
pub mod routes;
pub mod scheduler;
pub mod services;

use sqlx::PgPool;

use audit::AuditService;
use events::EventService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub audit: AuditService,
    pub events: EventService,
}
