//! Tessera Web Server
//!
//! Axum router exposing widget renders, instance lifecycle and a websocket
//! feed of instance updates.

pub mod routes;
pub mod state;
pub mod view;
pub mod websocket;

use axum::{routing::get, Router};
use tessera_core::EngineConfig;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Widgets
        .route("/widgets", get(routes::widgets::list_widgets))
        .route("/widgets/{id}/render", get(routes::widgets::render_widget))
        // Instances
        .route(
            "/instances",
            get(routes::instances::list_instances).post(routes::instances::mount_instance),
        )
        .route(
            "/instances/{id}",
            get(routes::instances::get_instance)
                .put(routes::instances::reconfigure_instance)
                .delete(routes::instances::unmount_instance),
        )
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .route("/widgets/{id}", get(routes::widgets::widget_frame))
        .route("/ws", get(websocket::ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Run the web server until ctrl-c, then unmount every instance.
pub async fn run_server(config: &EngineConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let supervisor = state.supervisor.clone();
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    supervisor.shutdown().await;
    Ok(())
}
