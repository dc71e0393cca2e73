//! End-to-end tests over the real router: registration, the freemium
//! calculate flow, project CRUD round-trips, and catalog access.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use craftprice::auth::AuthMiddlewareState;
use craftprice::config::Config;
use craftprice::handlers::AppState;
use craftprice::server::create_router;
use craftprice::storage::{CatalogStore, ProjectStore, UserStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await.unwrap();
    craftprice::MIGRATOR.run(&pool).await.unwrap();

    let users = Arc::new(UserStore::new(pool.clone()));
    let projects = Arc::new(ProjectStore::new(pool.clone()));
    let catalog = Arc::new(CatalogStore::new(pool.clone()));
    catalog.seed_default_categories().await.unwrap();

    let state = AppState {
        config: Arc::new(arc_swap::ArcSwap::from_pointee(Config::default())),
        users: users.clone(),
        projects,
        catalog,
        stripe: None,
    };
    let auth_state = Arc::new(AuthMiddlewareState {
        users,
        db_pool: pool,
    });

    (create_router(state, auth_state), dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": email })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

fn reference_input() -> Value {
    json!({
        "materials": [{ "name": "Yarn", "quantity": 2.0, "unit_cost": 5.0 }],
        "hourly_rate": 15.0,
        "hours_spent": 4.0,
        "complexity_factor": 1.2,
        "business_expenses": [{ "name": "Tools", "cost": 3.0 }],
        "profit_margin_percent": 30.0,
        "shipping_cost": 5.0,
        "tax_rate_percent": 5.0
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _dir) = test_app().await;
    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_and_fetch_current_user() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/auth/user", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "maker@example.com");
    assert_eq!(body["subscription_state"], "none");
    assert_eq!(body["calculations_used"], 0);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, request(Method::GET, "/api/projects", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "unauthorized");

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/projects", Some("cp_bogus"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_calculation_returns_reference_breakdown() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/calculations",
            Some(&token),
            Some(reference_input()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let breakdown = &body["breakdown"];
    assert_eq!(breakdown["materials_cost"].as_f64().unwrap(), 10.0);
    assert_eq!(breakdown["labor_cost"].as_f64().unwrap(), 72.0);
    assert_eq!(breakdown["business_cost"].as_f64().unwrap(), 3.0);
    assert_eq!(breakdown["base_cost"].as_f64().unwrap(), 85.0);
    assert_eq!(breakdown["profit_amount"].as_f64().unwrap(), 25.5);
    assert_eq!(breakdown["tax_amount"].as_f64().unwrap(), 4.25);
    assert_eq!(breakdown["wholesale_price"].as_f64().unwrap(), 119.75);
    assert_eq!(breakdown["retail_price"].as_f64().unwrap(), 239.5);

    assert_eq!(body["usage"]["unlimited"], false);
    assert_eq!(body["usage"]["calculations_used"], 1);
    assert_eq!(body["usage"]["calculations_remaining"], 6);
}

#[tokio::test]
async fn test_free_tier_exhaustion_and_upgrade() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    for used in 1..=7 {
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/calculations",
                Some(&token),
                Some(reference_input()),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usage"]["calculations_used"], used);
    }

    // The eighth calculation is an expected business denial, not a failure
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/calculations",
            Some(&token),
            Some(reference_input()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["limit_reached"], true);
    assert_eq!(body["error"]["type"], "limit_reached");

    // The denied attempt must not have consumed anything
    let (_, stats) = send(
        &app,
        request(Method::GET, "/api/subscription/stats", Some(&token), None),
    )
    .await;
    assert_eq!(stats["calculations_used"], 7);
    assert_eq!(stats["calculations_remaining"], 0);
    assert_eq!(stats["is_subscribed"], false);

    // Confirmed payment lifts the limit
    let (status, account) = send(
        &app,
        request(
            Method::POST,
            "/api/subscription/activate",
            Some(&token),
            Some(json!({ "plan": "lifetime" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["subscription_state"], "lifetime");

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/calculations",
            Some(&token),
            Some(reference_input()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usage"]["unlimited"], true);
    // Subscribed calculations no longer move the counter
    assert_eq!(body["usage"]["calculations_used"], 7);
}

#[tokio::test]
async fn test_project_crud_round_trip() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    let mut payload = reference_input();
    payload["name"] = json!("Baby blanket");
    payload["description"] = json!("Commission for a client");
    payload["status"] = json!("quoted");
    // Client-supplied breakdown values must be ignored and recomputed
    payload["retail_price"] = json!(1.0);

    let (status, project) = send(
        &app,
        request(Method::POST, "/api/projects", Some(&token), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = project["id"].as_i64().unwrap();
    assert_eq!(project["status"], "quoted");
    assert_eq!(project["wholesale_price"].as_f64().unwrap(), 119.75);
    assert_eq!(project["retail_price"].as_f64().unwrap(), 239.5);

    // The stored input reconstructs exactly
    let (status, input) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/projects/{}/input", id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(input, reference_input());

    // Replace and verify recomputation follows the new input
    let mut update = reference_input();
    update["name"] = json!("Baby blanket v2");
    update["status"] = json!("completed");
    update["shipping_cost"] = json!(0.0);
    let (status, updated) = send(
        &app,
        request(
            Method::PUT,
            &format!("/api/projects/{}", id),
            Some(&token),
            Some(update),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["wholesale_price"].as_f64().unwrap(), 114.75);
    assert_eq!(updated["retail_price"].as_f64().unwrap(), 229.5);

    let (status, listed) = send(
        &app,
        request(Method::GET, "/api/projects", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/projects/{}", id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/projects/{}", id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_does_not_consume_a_calculation_credit() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    let mut payload = reference_input();
    payload["name"] = json!("Scarf");
    let (status, _) = send(
        &app,
        request(Method::POST, "/api/projects", Some(&token), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, stats) = send(
        &app,
        request(Method::GET, "/api/subscription/stats", Some(&token), None),
    )
    .await;
    assert_eq!(stats["calculations_used"], 0);
    assert_eq!(stats["calculations_remaining"], 7);
}

#[tokio::test]
async fn test_projects_are_owner_scoped() {
    let (app, _dir) = test_app().await;
    let owner_token = register(&app, "owner@example.com").await;
    let other_token = register(&app, "other@example.com").await;

    let mut payload = reference_input();
    payload["name"] = json!("Secret commission");
    let (_, project) = send(
        &app,
        request(
            Method::POST,
            "/api/projects",
            Some(&owner_token),
            Some(payload),
        ),
    )
    .await;
    let id = project["id"].as_i64().unwrap();

    // A foreign project id behaves as missing, never as someone else's data
    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/projects/{}", id),
            Some(&other_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/projects/{}", id),
            Some(&other_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    let (status, categories) = send(
        &app,
        request(Method::GET, "/api/categories", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = categories
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Blankets", "Hats", "Scarves", "Bags"]);

    let (status, template) = send(
        &app,
        request(
            Method::POST,
            "/api/templates",
            Some(&token),
            Some(json!({
                "name": "Chunky beanie",
                "avg_hours": 3.0,
                "suggested_price": 35.0,
                "is_public": true,
                "materials": [{ "name": "Chunky yarn", "quantity": 2.0, "unit_cost": 6.0 }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let template_id = template["id"].as_i64().unwrap();

    let (status, fetched) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/templates/{}", template_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Chunky beanie");
    assert_eq!(fetched["materials"][0]["name"], "Chunky yarn");

    let (status, listed) = send(
        &app,
        request(Method::GET, "/api/templates", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_analytics_stats() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    for name in ["Blanket", "Hat"] {
        let mut payload = reference_input();
        payload["name"] = json!(name);
        let (status, _) = send(
            &app,
            request(Method::POST, "/api/projects", Some(&token), Some(payload)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = send(
        &app,
        request(Method::GET, "/api/analytics/stats", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_projects"], 2);
    assert_eq!(stats["total_revenue"].as_f64().unwrap(), 479.0);
    assert_eq!(stats["total_hours"].as_f64().unwrap(), 8.0);
    assert_eq!(stats["avg_margin"].as_f64().unwrap(), 30.0);
    assert_eq!(stats["monthly_projects"], 2);
}

#[tokio::test]
async fn test_subscription_requires_stripe_configuration() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "maker@example.com").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/subscription?plan=monthly",
            Some(&token),
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "config_error");

    // An unknown plan is rejected before Stripe is consulted
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/subscription?plan=weekly",
            Some(&token),
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
