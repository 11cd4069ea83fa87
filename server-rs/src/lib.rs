use axum::{
    http::{HeaderValue, Method},
    middleware as axum_mw,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use cache::Cache;
use config::Config;
use services::AdminRegistry;
use store::{MemoryStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Cache,
    pub config: Arc<Config>,
    pub admins: AdminRegistry,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, cache: Cache, config: Config) -> Self {
        let admins = AdminRegistry::new(&config.admin.emails);
        Self {
            store,
            cache,
            config: Arc::new(config),
            admins,
        }
    }

    /// Process-local state with no database and no Redis.
    pub fn in_memory(config: Config) -> Self {
        Self::new(Arc::new(MemoryStore::new()), Cache::disabled(), config)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    base.allow_origin(parsed)
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/session", post(routes::auth::start_session))
        .route("/me", get(routes::auth::me));

    let match_routes = Router::new()
        .route(
            "/",
            get(routes::matches::list_upcoming).post(routes::matches::create_match),
        )
        .route(
            "/:id",
            get(routes::matches::get_match)
                .put(routes::matches::update_match)
                .delete(routes::matches::delete_match),
        )
        .route("/:id/summary", get(routes::matches::get_summary))
        .route("/:id/preview", get(routes::matches::get_preview))
        .route(
            "/:id/signups",
            get(routes::signups::list_signups)
                .post(routes::signups::signup)
                .put(routes::signups::upsert_signup),
        )
        .route(
            "/:id/signups/:player_id",
            put(routes::signups::update_signup).delete(routes::signups::delete_signup),
        )
        .route("/:id/lineup/:team", get(routes::signups::get_lineup))
        .route(
            "/:id/lineup/:team/groups",
            get(routes::signups::get_lineup_groups),
        )
        .route("/:id/lineups", get(routes::signups::get_lineups));

    let player_routes = Router::new()
        .route("/", get(routes::players::list_players))
        .route("/search", get(routes::players::search_players))
        .route("/me", post(routes::players::register_self))
        .route(
            "/:id",
            get(routes::players::get_player).put(routes::players::update_player),
        );

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/matches", match_routes)
        .nest("/players", player_routes)
        .route("/stats", get(routes::stats::app_stats));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::resolve_identity,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
