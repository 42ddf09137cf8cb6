//! HTTP API server with observability for the storefront backend.
//!
//! Provides REST endpoints for the product catalog and for carts, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use application::Storefront;
use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{AppState, carts, products};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storefront>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", post(products::create::<S>).get(products::list::<S>))
        .route("/products/categories", get(products::categories::<S>))
        .route("/products/category/{name}", get(products::by_category::<S>))
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route("/carts", post(carts::create::<S>).get(carts::list::<S>))
        .route(
            "/carts/{id}",
            get(carts::get::<S>)
                .put(carts::change::<S>)
                .delete(carts::delete::<S>),
        )
        .route("/carts/{id}/items", post(carts::add_items::<S>))
        .route("/carts/{id}/items/delete", post(carts::delete_items::<S>))
        .route("/carts/{id}/cancel", post(carts::cancel::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with every service sharing `store`.
pub fn create_state<S: Storefront>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}
