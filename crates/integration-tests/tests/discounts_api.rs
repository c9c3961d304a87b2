//! Discount configuration management over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use autodiscount_integration_tests::{FakeCall, SHOP, TestApp};

fn body(value: u32, minimum: u32) -> Value {
    json!({
        "discountType": "fixed_amount",
        "value": value,
        "minimumAmount": minimum,
        "maximumAmount": null,
        "collections": [],
        "products": [632_910_392]
    })
}

async fn installed_app() -> TestApp {
    let mut app = TestApp::new();
    let response = app.install(SHOP).await;
    assert_eq!(response.status, StatusCode::FOUND);
    app
}

#[tokio::test]
async fn test_requires_connected_shop() {
    let mut app = TestApp::new();

    assert_eq!(app.get("/discount").await.status, StatusCode::UNAUTHORIZED);
    let create = app
        .send_json(Method::POST, "/discount/create", &body(10, 0))
        .await;
    assert_eq!(create.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.shopify.total_calls(), 0);
}

#[tokio::test]
async fn test_create_returns_configuration_with_remote_rule() {
    let mut app = installed_app().await;

    let response = app
        .send_json(Method::POST, "/discount/create", &body(10, 50))
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    let json = response.json();
    assert_eq!(json["message"], "Discount configuration saved");
    let config = &json["discountConfig"];
    assert_eq!(config["remoteRuleId"], 1001);
    assert_eq!(config["discountType"], "fixed_amount");
    assert_eq!(config["value"], "10");
    assert_eq!(config["products"], json!([632_910_392]));
    assert!(config["id"].as_str().is_some_and(|id| !id.is_empty()));

    let list = app.get("/discount").await.json();
    assert_eq!(list, json!([config.clone()]));
}

#[tokio::test]
async fn test_create_failure_leaves_list_unchanged() {
    let mut app = installed_app().await;
    let created = app
        .send_json(Method::POST, "/discount/create", &body(10, 0))
        .await
        .json();
    let before = app.get("/discount").await.json();
    app.shopify.fail(FakeCall::CreatePriceRule);

    let response = app
        .send_json(Method::POST, "/discount/create", &body(20, 0))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Error creating discount");
    assert_eq!(app.get("/discount").await.json(), before);
    assert_eq!(before, json!([created["discountConfig"].clone()]));
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let mut app = installed_app().await;

    let response = app
        .send_json(Method::POST, "/discount/create", &body(0, 0))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.shopify.count(FakeCall::CreatePriceRule), 0);
}

#[tokio::test]
async fn test_update_unknown_id_is_404_without_remote_call() {
    let mut app = installed_app().await;

    let response = app
        .send_json(Method::PUT, "/discount/update/does-not-exist", &body(10, 0))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Discount configuration not found");
    assert_eq!(app.shopify.count(FakeCall::UpdatePriceRule), 0);
}

#[tokio::test]
async fn test_update_replaces_configuration() {
    let mut app = installed_app().await;
    let created = app
        .send_json(Method::POST, "/discount/create", &body(10, 0))
        .await
        .json();
    let id = created["discountConfig"]["id"].as_str().unwrap().to_string();

    let response = app
        .send_json(Method::PUT, &format!("/discount/update/{id}"), &body(15, 100))
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let json = response.json();
    assert_eq!(json["message"], "Discount configuration updated");
    assert_eq!(json["discountConfig"]["id"], id.as_str());
    assert_eq!(json["discountConfig"]["value"], "15");
    assert_eq!(json["discountConfig"]["minimumAmount"], "100");
    assert_eq!(
        json["discountConfig"]["remoteRuleId"],
        created["discountConfig"]["remoteRuleId"]
    );
}

#[tokio::test]
async fn test_update_failure_keeps_configuration() {
    let mut app = installed_app().await;
    let created = app
        .send_json(Method::POST, "/discount/create", &body(10, 0))
        .await
        .json();
    let id = created["discountConfig"]["id"].as_str().unwrap().to_string();
    app.shopify.fail(FakeCall::UpdatePriceRule);

    let response = app
        .send_json(Method::PUT, &format!("/discount/update/{id}"), &body(15, 0))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        app.get("/discount").await.json(),
        json!([created["discountConfig"].clone()])
    );
}

#[tokio::test]
async fn test_delete_then_delete_again() {
    let mut app = installed_app().await;
    let created = app
        .send_json(Method::POST, "/discount/create", &body(10, 0))
        .await
        .json();
    let uri = format!(
        "/discount/delete/{}",
        created["discountConfig"]["id"].as_str().unwrap()
    );

    let first = app.delete(&uri).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json()["message"], "Discount configuration deleted");
    assert_eq!(app.get("/discount").await.json(), json!([]));

    let second = app.delete(&uri).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    assert_eq!(app.shopify.count(FakeCall::DeletePriceRule), 1);
}

#[tokio::test]
async fn test_delete_failure_keeps_configuration() {
    let mut app = installed_app().await;
    let created = app
        .send_json(Method::POST, "/discount/create", &body(10, 0))
        .await
        .json();
    app.shopify.fail(FakeCall::DeletePriceRule);

    let response = app
        .delete(&format!(
            "/discount/delete/{}",
            created["discountConfig"]["id"].as_str().unwrap()
        ))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.get("/discount").await.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_shops_do_not_see_each_others_configurations() {
    let mut first = installed_app().await;
    first
        .send_json(Method::POST, "/discount/create", &body(10, 0))
        .await;

    let mut second = first.new_browser();
    let response = second.install("other-store.myshopify.com").await;
    assert_eq!(response.status, StatusCode::FOUND);

    assert_eq!(second.get("/discount").await.json(), json!([]));
    assert_eq!(first.get("/discount").await.json().as_array().unwrap().len(), 1);
}
