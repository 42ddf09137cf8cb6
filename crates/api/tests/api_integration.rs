//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use common::UserId;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            api::routes::metrics::install_recorder().expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    api::create_app(api::create_state(InMemoryStore::new()), get_metrics_handle())
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn product_body(title: &str, price_cents: i64, category: &str) -> Value {
    json!({
        "title": title,
        "price_cents": price_cents,
        "description": format!("{title} for the test suite"),
        "image": "https://cdn.example.com/product.jpg",
        "rating": { "rate": 4.1, "count": 7 },
        "category": category
    })
}

async fn create_product(app: &axum::Router, title: &str, price_cents: i64) -> String {
    let response = send(
        app,
        "POST",
        "/products",
        None,
        Some(product_body(title, price_cents, "Kitchen")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["id"].as_str().unwrap().to_string()
}

async fn create_cart(app: &axum::Router, user: UserId, lines: Value) -> Value {
    let response = send(
        app,
        "POST",
        "/carts",
        Some(user),
        Some(json!({ "store_name": "Downtown", "items": lines })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let response = send(&app, "GET", "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_get_product() {
    let app = setup();
    let id = create_product(&app, "Mug", 450).await;

    let response = send(&app, "GET", &format!("/products/{id}"), None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["title"], "Mug");
    assert_eq!(json["price_cents"], 450);
    assert_eq!(json["category"], "Kitchen");
}

#[tokio::test]
async fn test_invalid_product_lists_errors() {
    let app = setup();
    let mut body = product_body("", -1, "Kitchen");
    body["image"] = json!("nope");

    let response = send(&app, "POST", "/products", None, Some(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    let fields: Vec<&str> = json["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["image", "price", "title"]);
}

#[tokio::test]
async fn test_duplicate_product_conflicts() {
    let app = setup();
    create_product(&app, "Mug", 450).await;

    let response = send(
        &app,
        "POST",
        "/products",
        None,
        Some(product_body("Mug", 999, "Kitchen")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_and_delete_product() {
    let app = setup();
    let id = create_product(&app, "Mug", 450).await;

    let response = send(
        &app,
        "PUT",
        &format!("/products/{id}"),
        None,
        Some(product_body("Large mug", 650, "Drinkware")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["category"], "Drinkware");

    let response = send(&app, "DELETE", &format!("/products/{id}"), None, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", &format!("/products/{id}"), None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_products_by_category_and_categories() {
    let app = setup();
    create_product(&app, "Mug", 450).await;
    create_product(&app, "Pan", 2500).await;
    send(
        &app,
        "POST",
        "/products",
        None,
        Some(product_body("Lamp", 3000, "Lighting")),
    )
    .await;

    let response = send(
        &app,
        "GET",
        "/products/category/kitchen?order=price%20desc",
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["total_count"], 2);
    assert_eq!(json["items"][0]["title"], "Pan");

    let response = send(&app, "GET", "/products/categories", None, None).await;
    let json = json_body(response).await;
    assert_eq!(json, json!(["Kitchen", "Lighting"]));
}

#[tokio::test]
async fn test_list_products_paginates() {
    let app = setup();
    for (title, price) in [("A", 100), ("B", 200), ("C", 300)] {
        create_product(&app, title, price).await;
    }

    let response = send(&app, "GET", "/products?page=2&size=2&order=title", None, None).await;

    let json = json_body(response).await;
    assert_eq!(json["total_count"], 3);
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["has_next"], false);
    assert_eq!(json["has_previous"], true);
    assert_eq!(json["items"][0]["title"], "C");
}

#[tokio::test]
async fn test_create_and_get_cart() {
    let app = setup();
    let mug = create_product(&app, "Mug", 450).await;
    let user = UserId::new();

    let created = create_cart(&app, user, json!([{ "product_id": mug, "quantity": 2 }])).await;
    assert_eq!(created["total_sale_amount_cents"], 900);
    assert_eq!(created["bought_by"], user.to_string());
    assert_eq!(created["purchase_status"], "Created");

    let id = created["id"].as_str().unwrap();
    let response = send(&app, "GET", &format!("/carts/{id}"), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
    assert_eq!(json["items"][0]["unit_price_cents"], 450);
}

#[tokio::test]
async fn test_create_cart_without_user_is_bad_request() {
    let app = setup();

    let response = send(
        &app,
        "POST",
        "/carts",
        None,
        Some(json!({ "store_name": "Downtown" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("bought_by"));
}

#[tokio::test]
async fn test_cart_line_too_large_is_bad_request() {
    let app = setup();
    let id = create_product(&app, "Yacht", i64::MAX / 2 + 1).await;

    let response = send(
        &app,
        "POST",
        "/carts",
        Some(UserId::new()),
        Some(json!({ "store_name": "Harbor", "items": [{ "product_id": id, "quantity": 2 }] })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_cart_with_invalid_id() {
    let app = setup();

    let response = send(&app, "GET", "/carts/not-a-uuid", None, None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_and_add_items() {
    let app = setup();
    let mug = create_product(&app, "Mug", 450).await;
    let user = UserId::new();
    let created = create_cart(&app, user, json!([])).await;
    let id = created["id"].as_str().unwrap();

    let response = send(
        &app,
        "PUT",
        &format!("/carts/{id}"),
        Some(user),
        Some(json!({ "store_name": "Uptown" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["store_name"], "Uptown");

    let response = send(
        &app,
        "POST",
        &format!("/carts/{id}/items"),
        None,
        Some(json!({ "items": [{ "product_id": mug, "quantity": 3 }] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["total_sale_amount_cents"], 1350);
}

#[tokio::test]
async fn test_cancel_cart() {
    let app = setup();
    let mug = create_product(&app, "Mug", 450).await;
    let user = UserId::new();
    let created = create_cart(&app, user, json!([{ "product_id": mug, "quantity": 1 }])).await;
    let id = created["id"].as_str().unwrap();

    let response = send(&app, "POST", &format!("/carts/{id}/cancel"), None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "POST", &format!("/carts/{id}/cancel"), Some(user), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["total_sale_amount_cents"], 0);
    assert_eq!(json["items"][0]["purchase_status"], "Cancelled");
    assert_eq!(json["items"][0]["cancelled_by"], user.to_string());
}

#[tokio::test]
async fn test_delete_items() {
    let app = setup();
    let mug = create_product(&app, "Mug", 450).await;
    let user = UserId::new();
    let created = create_cart(
        &app,
        user,
        json!([
            { "product_id": mug, "quantity": 1 },
            { "product_id": mug, "quantity": 2 }
        ]),
    )
    .await;
    let id = created["id"].as_str().unwrap();
    let first_item = created["items"][0]["id"].clone();

    let response = send(
        &app,
        "POST",
        &format!("/carts/{id}/items/delete"),
        Some(user),
        Some(json!({ "item_ids": [first_item] })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
    assert_eq!(json["total_sale_amount_cents"], 900);
}

#[tokio::test]
async fn test_delete_cart_hides_it() {
    let app = setup();
    let user = UserId::new();
    let created = create_cart(&app, user, json!([])).await;
    let id = created["id"].as_str().unwrap();

    let response = send(&app, "DELETE", &format!("/carts/{id}"), Some(user), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", &format!("/carts/{id}"), None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/carts", None, None).await;
    assert_eq!(json_body(response).await["total_count"], 0);
}

#[tokio::test]
async fn test_product_in_cart_cannot_be_deleted() {
    let app = setup();
    let mug = create_product(&app, "Mug", 450).await;
    create_cart(&app, UserId::new(), json!([{ "product_id": mug, "quantity": 1 }])).await;

    let response = send(&app, "DELETE", &format!("/products/{mug}"), None, None).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let user = UserId::new();
    create_cart(&app, user, json!([])).await;

    let response = send(&app, "GET", "/metrics", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("carts_created_total"));
}
