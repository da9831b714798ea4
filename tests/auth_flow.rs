// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end authentication tests against a mocked Keycloak realm.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use feedbacklab_auth::{
    api::router,
    auth::{JwksKeyStore, TokenValidator, ValidationError},
    state::AppState,
};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_for(server: &MockServer) -> Router {
    router(AppState::from_provider(common::provider_config(server)).unwrap())
}

async fn get(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn user_is_authenticated_but_not_admin() {
    let server = common::mock_idp(vec![common::k1_jwk()], 1).await;
    let app = app_for(&server);
    let token = common::sign_k1(&common::payload(&server, "u-42", &["user"]));

    let (status, body) = get(app.clone(), "/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u-42");
    assert_eq!(body["username"], "user42");
    assert_eq!(body["roles"]["realm_roles"][0], "user");

    let (status, body) = get(app, "/v1/admin/session", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "insufficient_permissions");
}

#[tokio::test]
async fn admin_reaches_admin_routes() {
    let server = common::mock_idp(vec![common::k1_jwk()], 1).await;
    let app = app_for(&server);
    let token = common::sign_k1(&common::payload(&server, "u-1", &["user", "admin"]));

    let (status, body) = get(app, "/v1/admin/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u-1");
    assert_eq!(body["client_id"], common::CLIENT_ID);
}

#[tokio::test]
async fn missing_token_is_401_without_fetching_keys() {
    let server = common::mock_idp(vec![common::k1_jwk()], 0).await;
    let app = app_for(&server);

    let (status, body) = get(app, "/v1/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "missing_auth_header");
}

#[tokio::test]
async fn foreign_issuer_is_401() {
    let server = common::mock_idp(vec![common::k1_jwk()], 1).await;
    let app = app_for(&server);

    let mut payload = common::payload(&server, "u-42", &["user"]);
    payload["iss"] = Value::String(format!("{}/realms/other", server.uri()));
    let token = common::sign_k1(&payload);

    let (status, body) = get(app, "/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn unpublished_kid_refreshes_once_then_fails() {
    // JWKS publishes no RSA key at all
    let server = common::mock_idp(
        vec![serde_json::json!({ "kty": "EC", "kid": "ec-1", "crv": "P-256" })],
        1,
    )
    .await;
    let config = common::provider_config(&server);
    let validator = TokenValidator::new(Arc::new(JwksKeyStore::new(&config).unwrap()), config);

    let token = common::sign_k1(&common::payload(&server, "u-42", &["user"]));
    let err = validator.validate(&token).await.unwrap_err();
    assert_eq!(err, ValidationError::KeyResolution { kid: "k1".to_string() });
}

#[tokio::test]
async fn malformed_key_set_is_reported_as_invalid_jwks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(common::CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"keys": 42}"#))
        .expect(1)
        .mount(&server)
        .await;
    let config = common::provider_config(&server);
    let validator = TokenValidator::new(Arc::new(JwksKeyStore::new(&config).unwrap()), config);

    let token = common::sign_k1(&common::payload(&server, "u-42", &["user"]));
    let err = validator.validate(&token).await.unwrap_err();
    assert!(matches!(err, ValidationError::KeySetInvalid(_)), "{err:?}");
}

#[tokio::test]
async fn keys_are_fetched_once_across_requests() {
    let server = common::mock_idp(vec![common::k1_jwk()], 1).await;
    let app = app_for(&server);

    for sub in ["u-1", "u-2", "u-3"] {
        let token = common::sign_k1(&common::payload(&server, sub, &["user"]));
        let (status, body) = get(app.clone(), "/v1/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], sub);
    }
}

#[tokio::test]
async fn readiness_reports_jwks_status() {
    let server = common::mock_idp(vec![common::k1_jwk()], 1).await;
    let app = app_for(&server);

    let (status, body) = get(app, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["jwks"], "ok");
}
