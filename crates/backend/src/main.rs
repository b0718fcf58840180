use axum::{
    http::{header, Method, StatusCode},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod auth;
mod db;
pub mod error;
mod handlers;
mod models;
mod schema;
pub mod services;

use auth::types::AuthConfig;
use services::push::{PushConfig, WebPushClient};
use services::sync::SyncConfig;

/// Process-wide configuration and shared clients, built once at startup and
/// injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: db::DbPool,
    pub auth: AuthConfig,
    pub push: Option<Arc<WebPushClient>>,
    pub sync: SyncConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    // Establish database connection pool
    let pool = db::establish_connection_pool()?;

    let auth_config = AuthConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let push = match PushConfig::from_env() {
        Some(config) => Some(Arc::new(WebPushClient::new(&config)?)),
        None => {
            tracing::warn!(
                "VAPID keys not configured; notifications will be recorded but not pushed"
            );
            None
        }
    };

    let state = AppState {
        pool,
        auth: auth_config,
        push,
        sync: SyncConfig::from_env(),
    };

    let public_routes = Router::new()
        .route("/health", get(health_check))
        // Public availability
        .route(
            "/api/availability/user/:username",
            get(handlers::availability::get_user_availability),
        )
        .route(
            "/api/availability/find-overlap",
            post(handlers::availability::find_overlap),
        )
        // Profile discovery
        .route("/api/profiles", get(handlers::profiles::search_profiles))
        .route(
            "/api/profiles/:username",
            get(handlers::profiles::get_profile),
        )
        // Push bootstrap
        .route(
            "/api/push/vapid-public-key",
            get(handlers::push::vapid_public_key),
        );

    let protected_routes = Router::new()
        // Identity
        .route("/api/auth/me", get(auth::auth_me))
        // Own availability
        .route(
            "/api/availability/me",
            get(handlers::availability::get_my_availability),
        )
        .route(
            "/api/availability",
            post(handlers::availability::create_availability),
        )
        .route(
            "/api/availability/:id",
            put(handlers::availability::update_availability)
                .delete(handlers::availability::delete_availability),
        )
        // Friend graph
        .route(
            "/api/friends/request/:user_id",
            post(handlers::friends::send_request),
        )
        .route(
            "/api/friends/accept/:edge_id",
            post(handlers::friends::accept_request),
        )
        .route(
            "/api/friends/decline/:edge_id",
            post(handlers::friends::decline_request),
        )
        .route(
            "/api/friends/cancel/:edge_id",
            delete(handlers::friends::cancel_request),
        )
        .route(
            "/api/friends/remove/:edge_id",
            delete(handlers::friends::remove_friend),
        )
        .route(
            "/api/friends/block/:user_id",
            post(handlers::friends::block_user),
        )
        .route(
            "/api/friends/unblock/:user_id",
            post(handlers::friends::unblock_user),
        )
        .route(
            "/api/friends/status/:user_id",
            get(handlers::friends::friendship_status),
        )
        .route("/api/friends", get(handlers::friends::list_friends))
        .route(
            "/api/friends/requests",
            get(handlers::friends::list_requests),
        )
        // Calendar integration
        .route("/api/calendar/google", get(handlers::calendar::get_connection))
        .route(
            "/api/calendar/google/connect",
            post(handlers::calendar::connect),
        )
        .route(
            "/api/calendar/google/disconnect",
            delete(handlers::calendar::disconnect),
        )
        .route(
            "/api/calendar/google/calendars",
            get(handlers::calendar::list_calendars),
        )
        .route("/api/calendar/google/sync", post(handlers::calendar::sync))
        // Notifications
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/notifications/read",
            post(handlers::notifications::mark_read),
        )
        .route(
            "/api/notifications/expired",
            delete(handlers::notifications::delete_expired),
        )
        // Push subscriptions
        .route("/api/push/subscribe", post(handlers::push::subscribe))
        .route(
            "/api/push/unsubscribe",
            delete(handlers::push::unsubscribe),
        )
        .route("/api/push/test", post(handlers::push::send_test))
        // Own profile
        .route(
            "/api/profiles/me",
            get(handlers::profiles::get_me).put(handlers::profiles::update_me),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let app = public_routes
        .merge(protected_routes)
        .layer(build_cors_layer())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Build CORS layer based on environment configuration.
///
/// If CORS_ALLOWED_ORIGINS is set, only those origins are allowed.
/// If not set, defaults to permissive CORS (for development only).
fn build_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS").ok();

    match allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS (not recommended for production)"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                    .allow_credentials(true)
            }
        }
        None => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
            );
            CorsLayer::permissive()
        }
    }
}
