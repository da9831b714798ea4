// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures for integration tests: fixed RSA keys and a mocked realm JWKS.

#![allow(dead_code)]

use feedbacklab_auth::config::ProviderConfig;
use jsonwebtoken::{encode, get_current_timestamp, Algorithm, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REALM: &str = "demo";
pub const CLIENT_ID: &str = "feedbacklab-api";
pub const CERTS_PATH: &str = "/realms/demo/protocol/openid-connect/certs";

const K1_PEM: &str = include_str!("../fixtures/k1.pem");
const K1_MODULUS: &str = include_str!("../fixtures/k1.n");

pub fn now() -> i64 {
    get_current_timestamp() as i64
}

pub fn k1_jwk() -> serde_json::Value {
    json!({
        "kty": "RSA",
        "kid": "k1",
        "use": "sig",
        "alg": "RS256",
        "n": K1_MODULUS.trim(),
        "e": "AQAB"
    })
}

/// Start a mock IdP publishing `keys`, expecting `expected_fetches` JWKS calls.
pub async fn mock_idp(keys: Vec<serde_json::Value>, expected_fetches: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
        .expect(expected_fetches)
        .mount(&server)
        .await;
    server
}

pub fn provider_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::new(server.uri(), REALM, CLIENT_ID)
}

pub fn payload(server: &MockServer, sub: &str, realm_roles: &[&str]) -> serde_json::Value {
    json!({
        "sub": sub,
        "iss": format!("{}/realms/{REALM}", server.uri()),
        "aud": ["account"],
        "azp": CLIENT_ID,
        "exp": now() + 300,
        "iat": now(),
        "email": "u42@example.com",
        "preferred_username": "user42",
        "realm_access": { "roles": realm_roles }
    })
}

pub fn sign_k1(payload: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("k1".to_string());
    let key = EncodingKey::from_rsa_pem(K1_PEM.as_bytes()).expect("valid test key");
    encode(&header, payload, &key).expect("token signs")
}
