//! Integration tests for the pricing endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, money, post_json, put_json};
use posada_pricing::pricing::models::{ModularCategory, NewModularProduct, NewPackage};
use posada_pricing::store::PricingStore;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn low_season() -> Value {
    json!({
        "name": "Temporada baja",
        "season_type": "low",
        "start_date": "2025-01-01",
        "end_date": "2025-03-31",
        "discount_percent": "10",
        "priority": 1,
        "applies_to_rooms": true
    })
}

fn high_season() -> Value {
    json!({
        "name": "Puente de febrero",
        "season_type": "high",
        "start_date": "2025-02-10",
        "end_date": "2025-02-20",
        "discount_percent": "-20",
        "priority": 5,
        "applies_to_rooms": true
    })
}

fn room_quote(start: &str, end: &str) -> Value {
    json!({
        "start_date": start,
        "end_date": end,
        "selections": [
            {"audience": "room", "reference": "101", "base_price_per_night": "100"}
        ]
    })
}

#[tokio::test]
async fn health_reports_cache_stats() {
    let (app, _) = common::build_test_app();
    let response = get(&app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["cache"]["product_codes_size"].is_number());
}

#[tokio::test]
async fn single_low_season_rule_prices_february_first_at_ninety() {
    let (app, _) = common::build_test_app();
    let saved = post_json(&app, "/pricing/seasons", low_season()).await;
    assert_eq!(saved.status(), StatusCode::OK);

    let response = get(
        &app,
        "/pricing/seasons/resolve?date=2025-02-01&audience=room&base_price=100",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["rule"]["name"], "Temporada baja");
    assert_eq!(money(&json["price"]["seasonal_price"]), dec!(90));
}

#[tokio::test]
async fn higher_priority_rule_wins_inside_its_window() {
    let (app, _) = common::build_test_app();
    post_json(&app, "/pricing/seasons", low_season()).await;
    post_json(&app, "/pricing/seasons", high_season()).await;

    let feb15 = body_json(
        get(&app, "/pricing/seasons/resolve?date=2025-02-15&audience=room&base_price=100").await,
    )
    .await;
    assert_eq!(money(&feb15["price"]["seasonal_price"]), dec!(120));
    assert_eq!(feb15["rule"]["season_type"], "high");

    let feb5 = body_json(
        get(&app, "/pricing/seasons/resolve?date=2025-02-05&audience=room&base_price=100").await,
    )
    .await;
    assert_eq!(money(&feb5["price"]["seasonal_price"]), dec!(90));

    let program =
        body_json(get(&app, "/pricing/seasons/resolve?date=2025-02-15&audience=program").await)
            .await;
    assert!(program["rule"].is_null());
}

#[tokio::test]
async fn quote_across_a_season_boundary() {
    let (app, _) = common::build_test_app();
    post_json(&app, "/pricing/seasons", low_season()).await;
    post_json(&app, "/pricing/seasons", high_season()).await;

    let response = post_json(&app, "/pricing/quote", room_quote("2025-02-08", "2025-02-12")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["nights"], 4);
    assert_eq!(json["lines"].as_array().unwrap().len(), 4);
    assert_eq!(money(&json["grand_total"]), dec!(420));
    assert_eq!(money(&json["final_price"]), dec!(420));
    assert!(json["quote_id"].is_string());
}

#[tokio::test]
async fn inverted_stay_is_a_bad_request() {
    let (app, _) = common::build_test_app();
    let response = post_json(&app, "/pricing/quote", room_quote("2025-02-12", "2025-02-08")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "invalid_date_range");
}

#[tokio::test]
async fn overflowing_amounts_are_unprocessable() {
    let (app, _) = common::build_test_app();
    let response = post_json(
        &app,
        "/pricing/quote",
        json!({
            "start_date": "2025-02-08",
            "end_date": "2025-02-09",
            "selections": [
                {"audience": "room", "reference": "101", "base_price_per_night": "50000000000000000000000000000", "quantity": 2}
            ]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error_type"], "amount_overflow");
}

#[tokio::test]
async fn stay_beyond_the_night_limit_is_a_bad_request() {
    let (app, _) = common::build_test_app();
    let response = post_json(&app, "/pricing/quote", room_quote("2025-01-01", "2025-06-01")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "stay_too_long");
    assert_eq!(json["details"]["max_nights"], 60);
}

#[tokio::test]
async fn invalid_season_rule_is_unprocessable() {
    let (app, _) = common::build_test_app();
    let mut rule = low_season();
    rule["applies_to_rooms"] = json!(false);

    let response = post_json(&app, "/pricing/seasons", rule).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error_type"], "invalid_season_rule");
}

#[tokio::test]
async fn overlaps_list_intersecting_rules() {
    let (app, _) = common::build_test_app();
    post_json(&app, "/pricing/seasons", low_season()).await;
    post_json(&app, "/pricing/seasons", high_season()).await;

    let json = body_json(
        get(&app, "/pricing/seasons/overlaps?start_date=2025-03-15&end_date=2025-04-15").await,
    )
    .await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Temporada baja"]);
}

#[tokio::test]
async fn catalog_sync_is_idempotent() {
    let (app, store) = common::build_test_app();
    let items = json!({
        "items": [
            {"id": 42, "name": "Suite Deluxe", "base_price": "250.00", "category": "Hospedaje"},
            {"id": 43, "name": "Masaje relajante", "base_price": "-5", "category": "Spa"}
        ]
    });

    let first = body_json(post_json(&app, "/pricing/catalog/sync", items.clone()).await).await;
    assert_eq!(first["created"], 1);
    assert_eq!(first["errors"][0]["item_id"], 43);

    let second = body_json(post_json(&app, "/pricing/catalog/sync", items).await).await;
    assert_eq!(second["created"], 0);
    assert_eq!(second["skipped"], 1);

    let mirrored: Vec<_> = store
        .list_modular_products()
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.source_item_id == Some(42))
        .collect();
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].code, "SUITE_DELUXE_42");
}

#[tokio::test]
async fn refresh_prices_updates_changed_mirrors() {
    let (app, store) = common::build_test_app();
    post_json(
        &app,
        "/pricing/catalog/sync",
        json!({"items": [{"id": 7, "name": "Desayuno", "base_price": "12.00"}]}),
    )
    .await;

    let report = body_json(
        post_json(
            &app,
            "/pricing/catalog/refresh-prices",
            json!({"items": [
                {"id": 7, "name": "Desayuno", "base_price": "14.50"},
                {"id": 8, "name": "Cena", "base_price": "30.00"}
            ]}),
        )
        .await,
    )
    .await;
    assert_eq!(report["updated"], 1);
    assert_eq!(report["skipped"], 1);

    let product = store.find_modular_by_source(7).await.unwrap().unwrap();
    assert_eq!(product.price, dec!(14.50));
}

#[tokio::test]
async fn package_details_and_linking() {
    let (app, store) = common::build_test_app();
    let package = store
        .insert_package(&NewPackage {
            name: "Escapada".to_string(),
            code: "PKG-ESCAPE".to_string(),
            description: Some("Cena y spa".to_string()),
        })
        .await
        .unwrap();
    let mut ids = Vec::new();
    for (source, price) in [(1, dec!(30)), (2, dec!(20))] {
        let product = store
            .insert_modular_product(&NewModularProduct {
                code: format!("EXTRA_{}", source),
                name: format!("Extra {}", source),
                price,
                category: ModularCategory::Food,
                source_item_id: Some(source),
            })
            .await
            .unwrap();
        ids.push(product.id);
    }

    let linked = put_json(
        &app,
        &format!("/pricing/packages/{}/products", package.id),
        json!({"modular_product_ids": ids}),
    )
    .await;
    assert_eq!(linked.status(), StatusCode::OK);
    assert_eq!(body_json(linked).await["products"].as_array().unwrap().len(), 2);

    let details = body_json(get(&app, &format!("/pricing/packages/{}", package.id)).await).await;
    assert_eq!(money(&details["display_price"]), dec!(50));
    assert_eq!(details["package"]["code"], "PKG-ESCAPE");

    let rejected = put_json(
        &app,
        &format!("/pricing/packages/{}/products", package.id),
        json!({"modular_product_ids": [ids[0], 999]}),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(rejected).await["details"]["modular_product_ids"], json!([999]));

    let missing = get(&app, "/pricing/packages/999").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    store.set_package_active(package.id, false).await.unwrap();
    let inactive = post_json(
        &app,
        "/pricing/quote",
        json!({
            "start_date": "2025-06-01",
            "end_date": "2025-06-04",
            "package_id": package.id
        }),
    )
    .await;
    assert_eq!(inactive.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(inactive).await["error_type"], "inactive_package");
}
