//! Prometheus recorder and metrics endpoint.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Installs the global Prometheus recorder and describes the counters the
/// services emit.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("carts_created_total", "Carts created");
    metrics::describe_counter!("carts_cancelled_total", "Carts whose items were cancelled");
    metrics::describe_counter!("carts_deleted_total", "Carts soft-deleted");
    metrics::describe_counter!("cart_items_deleted_total", "Cart items soft-deleted");
    metrics::describe_counter!("products_created_total", "Products added to the catalog");

    Ok(handle)
}

/// GET /metrics: Prometheus text exposition.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
