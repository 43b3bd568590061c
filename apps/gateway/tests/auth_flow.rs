mod common;
mod support;

use actix_web::test;
use common::{assert_error, success_data};
use gateway::auth::claims::Role;
use gateway::repos::refresh_tokens::count_for_user;
use gateway::state::security_config::SecurityConfig;
use serde_json::{json, Value};
use support::{seed_user, state_builder, PASSWORD, TEST_SECRET};

fn login_request(email: &str, password: &str) -> actix_http::Request {
    test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request()
}

#[actix_web::test]
async fn login_returns_token_pair_and_user() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    let user = seed_user(&state, "alice@example.com", Role::User, true).await;
    let app = support::create_test_app(&state).await;

    let resp = test::call_service(&app, login_request("Alice@Example.com", PASSWORD)).await;

    let data = success_data(resp).await;

    assert!(data["access_token"].as_str().unwrap().starts_with("eyJ"));
    assert!(data["refresh_token"].as_str().unwrap().starts_with("eyJ"));
    assert_eq!(data["expires_in"], 3600);
    assert_eq!(data["user"]["id"], user.id.to_string());
    assert_eq!(data["user"]["email"], "alice@example.com");
    assert_eq!(data["user"]["role"], "user");

    let claims = state
        .auth
        .validate_access(data["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, user.id);
}

#[actix_web::test]
async fn bad_credentials_are_indistinguishable() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    seed_user(&state, "bob@example.com", Role::User, true).await;
    seed_user(&state, "carol@example.com", Role::User, false).await;
    let app = support::create_test_app(&state).await;

    let resp = test::call_service(&app, login_request("bob@example.com", "nope")).await;
    let wrong_password = assert_error(resp, 401, "INVALID_CREDENTIALS").await;
    let resp = test::call_service(&app, login_request("nobody@example.com", PASSWORD)).await;
    let unknown_email = assert_error(resp, 401, "INVALID_CREDENTIALS").await;
    let resp = test::call_service(&app, login_request("carol@example.com", PASSWORD)).await;
    let inactive = assert_error(resp, 401, "INVALID_CREDENTIALS").await;

    assert_eq!(wrong_password["message"], unknown_email["message"]);
    assert_eq!(wrong_password["message"], inactive["message"]);
}

#[actix_web::test]
async fn login_body_is_validated() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    let app = support::create_test_app(&state).await;

    let resp = test::call_service(&app, login_request("", PASSWORD)).await;
    assert_error(resp, 400, "VALIDATION_ERROR").await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    assert_error(test::call_service(&app, req).await, 400, "BAD_REQUEST").await;
}

#[actix_web::test]
async fn refresh_then_logout_revokes_the_refresh_token() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    seed_user(&state, "dave@example.com", Role::Admin, true).await;
    let app = support::create_test_app(&state).await;

    let resp = test::call_service(&app, login_request("dave@example.com", PASSWORD)).await;

    let tokens = success_data(resp).await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();
    let access_token = tokens["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": refresh_token }))
        .to_request();
    let refreshed = success_data(test::call_service(&app, req).await).await;
    let new_access = refreshed["access_token"].as_str().unwrap();
    assert!(refreshed.get("refresh_token").is_none());
    let claims = state.auth.validate_access(new_access).unwrap();
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.email, "dave@example.com");

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header(("Authorization", format!("Bearer {access_token}")))
        .set_json(json!({ "refresh_token": refresh_token }))
        .to_request();
    success_data(test::call_service(&app, req).await).await;

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": refresh_token }))
        .to_request();
    assert_error(test::call_service(&app, req).await, 401, "INVALID_REFRESH_TOKEN").await;
}

#[actix_web::test]
async fn access_token_is_not_a_refresh_token() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    seed_user(&state, "erin@example.com", Role::User, true).await;
    let app = support::create_test_app(&state).await;

    let resp = test::call_service(&app, login_request("erin@example.com", PASSWORD)).await;

    let tokens = success_data(resp).await;
    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": tokens["access_token"] }))
        .to_request();
    assert_error(test::call_service(&app, req).await, 401, "INVALID_REFRESH_TOKEN").await;
}

#[actix_web::test]
async fn rotation_replaces_the_presented_refresh_token() {
    let state = state_builder("http://127.0.0.1:1")
        .with_security(SecurityConfig::new(TEST_SECRET.to_vec()).with_rotation(true))
        .build()
        .await
        .unwrap();
    seed_user(&state, "frank@example.com", Role::User, true).await;
    let app = support::create_test_app(&state).await;

    let resp = test::call_service(&app, login_request("frank@example.com", PASSWORD)).await;

    let tokens = success_data(resp).await;
    let original = tokens["refresh_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": original }))
        .to_request();
    let refreshed = success_data(test::call_service(&app, req).await).await;
    let rotated = refreshed["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, original);

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": original }))
        .to_request();
    assert_error(test::call_service(&app, req).await, 401, "INVALID_REFRESH_TOKEN").await;

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": rotated }))
        .to_request();
    success_data(test::call_service(&app, req).await).await;
}

#[actix_web::test]
async fn validate_reports_valid_and_invalid_tokens() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    let user = seed_user(&state, "gina@example.com", Role::User, true).await;
    let app = support::create_test_app(&state).await;

    let good = support::access_token(&state, &user, time::Duration::minutes(10));
    let req = test::TestRequest::post()
        .uri("/auth/validate")
        .set_json(json!({ "token": good }))
        .to_request();
    let data = success_data(test::call_service(&app, req).await).await;
    assert_eq!(data["valid"], true);
    assert_eq!(data["user"]["id"], user.id.to_string());
    assert!(data["expires_at"].is_string());

    let expired = support::access_token(&state, &user, time::Duration::seconds(-1));
    let req = test::TestRequest::post()
        .uri("/auth/validate")
        .set_json(json!({ "token": expired }))
        .to_request();
    let data = success_data(test::call_service(&app, req).await).await;
    assert_eq!(data["valid"], false);
    assert_eq!(data["reason"], "TOKEN_EXPIRED");
    assert!(data.get("user").is_none());

    let req = test::TestRequest::post()
        .uri("/auth/validate")
        .set_json(json!({ "token": "garbage" }))
        .to_request();
    let data = success_data(test::call_service(&app, req).await).await;
    assert_eq!(data, json!({ "valid": false, "reason": "INVALID_TOKEN" }));
}

#[actix_web::test]
async fn logout_all_revokes_every_session() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    let hank = seed_user(&state, "hank@example.com", Role::User, true).await;
    let app = support::create_test_app(&state).await;

    let resp = test::call_service(&app, login_request("hank@example.com", PASSWORD)).await;

    let first = success_data(resp).await;
    let resp = test::call_service(&app, login_request("hank@example.com", PASSWORD)).await;
    let second = success_data(resp).await;

    let req = test::TestRequest::post().uri("/auth/logout-all").to_request();
    assert_error(test::call_service(&app, req).await, 401, "MISSING_AUTH_HEADER").await;

    let req = test::TestRequest::post()
        .uri("/auth/logout-all")
        .insert_header((
            "Authorization",
            format!("Bearer {}", first["access_token"].as_str().unwrap()),
        ))
        .to_request();
    let data: Value = success_data(test::call_service(&app, req).await).await;
    assert_eq!(data["revoked"], 2);
    let remaining = count_for_user(state.db().unwrap(), hank.id).await.unwrap();
    assert_eq!(remaining, 0);

    for tokens in [first, second] {
        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(json!({ "refresh_token": tokens["refresh_token"] }))
            .to_request();
        assert_error(test::call_service(&app, req).await, 401, "INVALID_REFRESH_TOKEN").await;
    }
}

#[actix_web::test]
async fn logout_with_unverifiable_tokens_is_rejected() {
    let state = state_builder("http://127.0.0.1:1").build().await.unwrap();
    let app = support::create_test_app(&state).await;

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .set_json(json!({ "refresh_token": "not-a-token" }))
        .to_request();
    assert_error(test::call_service(&app, req).await, 401, "INVALID_TOKEN").await;
}
