#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App};
use pins4days::repo::inmem::InMemRepo;
use pins4days::repo::PinRepo;
use pins4days::{config, worker_config, AppConfig, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

const TOKEN: &str = "verification-token-0";
const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

fn state(repo: &InMemRepo) -> web::Data<AppState> {
    web::Data::new(AppState {
        repo: Arc::new(repo.clone()),
        config: Arc::new(AppConfig::new(TOKEN, SECRET)),
    })
}

fn fixture(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

#[actix_web::test]
async fn test_url_verification_echoes_challenge() {
    let repo = InMemRepo::new();
    let app = test::init_service(App::new().app_data(state(&repo)).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/pins")
        .set_json(json!({"type": "url_verification", "token": TOKEN, "challenge": "abc123"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v, json!({"challenge": "abc123"}));
    assert!(repo.query_all(10).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_bad_token_is_unauthorized() {
    let repo = InMemRepo::new();
    let app = test::init_service(App::new().app_data(state(&repo)).configure(config)).await;

    let mut wrong = fixture(include_str!("data/pin_added_message.json"));
    wrong["token"] = json!("not-the-token");
    let mut missing = fixture(include_str!("data/pin_added_message.json"));
    missing.as_object_mut().unwrap().remove("token");

    for body in [wrong, missing, json!({"challenge": "abc123"})] {
        let req = test::TestRequest::post().uri("/api/pins").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        let v: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        assert_eq!(v, json!({"message": "Missing or unrecognized token."}));
    }

    let req = test::TestRequest::post()
        .uri("/api/pins")
        .insert_header(("content-type", "application/json"))
        .set_payload("this is not json")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    assert!(repo.query_all(10).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_pin_event_is_stored_once() {
    let repo = InMemRepo::new();
    let app = test::init_service(App::new().app_data(state(&repo)).configure(config)).await;
    let body = fixture(include_str!("data/pin_added_link.json"));

    for _ in 0..2 {
        let req = test::TestRequest::post().uri("/api/pins").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        assert!(test::read_body(resp).await.is_empty());
    }

    let pins = repo.query_all(10).await.unwrap();
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].key, "channel-id-0_1525829847.000217");
}

#[actix_web::test]
async fn test_malformed_event_is_server_error() {
    let repo = InMemRepo::new();
    let app = test::init_service(App::new().app_data(state(&repo)).configure(config)).await;

    let mut body = fixture(include_str!("data/pin_added_image.json"));
    body["event"]["item"]["message"].as_object_mut().unwrap().remove("ts");
    let req = test::TestRequest::post().uri("/api/pins").set_json(body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
    let v: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(v["message"].as_str().unwrap().contains("event.item.message.ts"));
    assert!(repo.query_all(10).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_list_pins_shape_and_filter() {
    let repo = InMemRepo::new();
    let app = test::init_service(App::new().app_data(state(&repo)).configure(config)).await;

    for raw in [
        include_str!("data/pin_added_image.json"),
        include_str!("data/pin_added_link.json"),
        include_str!("data/pin_added_message.json"),
        include_str!("data/pin_added_multi.json"),
    ] {
        let req = test::TestRequest::post().uri("/api/pins").set_json(fixture(raw)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }

    let req = test::TestRequest::get().uri("/api/pins").to_request();
    let v: Value = test::call_and_read_body_json(&app, req).await;
    let pins = v["data"]["pins"].as_array().unwrap();
    assert_eq!(pins.len(), 4);
    let created: Vec<i64> = pins.iter().map(|p| p["created_ts"].as_i64().unwrap()).collect();
    assert!(created.windows(2).all(|w| w[0] >= w[1]));
    assert!(pins.iter().all(|p| p.get("key").is_none()));
    assert!(pins.iter().all(|p| p["attachments"].is_array()));

    let req = test::TestRequest::get().uri("/api/pins?user_id=user-0").to_request();
    let v: Value = test::call_and_read_body_json(&app, req).await;
    let pins = v["data"]["pins"].as_array().unwrap();
    assert!(!pins.is_empty());
    assert!(pins.iter().all(|p| p["author_id"] == "user-0"));

    let req = test::TestRequest::get().uri("/api/pins?user_id=nobody").to_request();
    let v: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v, json!({"data": {"pins": []}}));

    // empty filter behaves like no filter
    let req = test::TestRequest::get().uri("/api/pins?user_id=").to_request();
    let v: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v["data"]["pins"].as_array().unwrap().len(), 4);
}

#[actix_web::test]
async fn test_worker_route_only_when_mounted() {
    let repo = InMemRepo::new();
    let body = fixture(include_str!("data/pin_added_multi.json"));

    let app = test::init_service(App::new().app_data(state(&repo)).configure(config)).await;
    let req = test::TestRequest::post().uri("/worker/create_pin").set_json(&body).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let app = test::init_service(App::new().app_data(state(&repo)).configure(config).configure(worker_config)).await;
    let req = test::TestRequest::post().uri("/worker/create_pin").set_json(&body).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
    assert!(repo.get_pin("channel-id-0_1525831511.000182").await.is_ok());
}

#[actix_web::test]
async fn test_worker_route_accepts_untyped_body() {
    let repo = InMemRepo::new();
    let app = test::init_service(App::new().app_data(state(&repo)).configure(config).configure(worker_config)).await;

    let req = test::TestRequest::post()
        .uri("/worker/create_pin")
        .insert_header(("content-type", "application/octet-stream"))
        .set_payload(include_str!("data/pin_added_multi.json"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
    assert!(repo.get_pin("channel-id-0_1525831511.000182").await.is_ok());

    let req = test::TestRequest::post()
        .uri("/worker/create_pin")
        .insert_header(("content-type", "application/octet-stream"))
        .set_payload("not json")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 500);
    assert_eq!(repo.query_all(10).await.unwrap().len(), 1);
}
