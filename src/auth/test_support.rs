// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for auth unit tests: fixed RSA keys, token signing and an
//! in-memory key store.

use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::json;

use super::error::KeyStoreError;
use super::jwks::KeyStore;
use crate::config::ProviderConfig;

pub const K1_KID: &str = "k1";
pub const K2_KID: &str = "k2";
pub const REALM: &str = "demo";
pub const CLIENT_ID: &str = "feedbacklab-api";

const K1_PEM: &str = include_str!("../../tests/fixtures/k1.pem");
const K2_PEM: &str = include_str!("../../tests/fixtures/k2.pem");
const K1_MODULUS: &str = include_str!("../../tests/fixtures/k1.n");
const K2_MODULUS: &str = include_str!("../../tests/fixtures/k2.n");
const EXPONENT: &str = "AQAB";

pub fn provider_config(base_url: &str) -> ProviderConfig {
    ProviderConfig::new(base_url, REALM, CLIENT_ID)
}

pub fn now() -> i64 {
    jsonwebtoken::get_current_timestamp() as i64
}

pub fn k1_encoding_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(K1_PEM.as_bytes()).unwrap()
}

pub fn k2_encoding_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(K2_PEM.as_bytes()).unwrap()
}

pub fn k1_jwk() -> serde_json::Value {
    rsa_jwk(K1_KID, K1_MODULUS)
}

pub fn k2_jwk() -> serde_json::Value {
    rsa_jwk(K2_KID, K2_MODULUS)
}

fn rsa_jwk(kid: &str, modulus: &str) -> serde_json::Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": modulus.trim(),
        "e": EXPONENT
    })
}

pub fn jwks(keys: &[serde_json::Value]) -> serde_json::Value {
    json!({ "keys": keys })
}

/// Unexpired payload from the `demo` realm addressed to [`CLIENT_ID`].
pub fn valid_payload(sub: &str) -> serde_json::Value {
    json!({
        "sub": sub,
        "iss": "https://idp.example/realms/demo",
        "aud": [CLIENT_ID],
        "azp": CLIENT_ID,
        "exp": now() + 300,
        "iat": now(),
        "email": "jane@example.com",
        "email_verified": true,
        "preferred_username": "jdoe",
        "given_name": "Jane",
        "family_name": "Doe",
        "realm_access": { "roles": ["user"] },
        "resource_access": { "account": { "roles": ["manage-account"] } }
    })
}

pub fn sign_with(key: EncodingKey, kid: Option<&str>, payload: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(&header, payload, &key).unwrap()
}

pub fn sign_k1(payload: &serde_json::Value) -> String {
    sign_with(k1_encoding_key(), Some(K1_KID), payload)
}

/// Key store with a fixed key map and no network.
pub struct StaticKeyStore {
    keys: HashMap<String, DecodingKey>,
}

impl StaticKeyStore {
    pub fn with_k1() -> Self {
        let key = DecodingKey::from_rsa_components(K1_MODULUS.trim(), EXPONENT).unwrap();
        Self {
            keys: HashMap::from([(K1_KID.to_string(), key)]),
        }
    }
}

#[async_trait]
impl KeyStore for StaticKeyStore {
    async fn get_key(&self, kid: &str) -> Result<DecodingKey, KeyStoreError> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| KeyStoreError::NotFound(kid.to_string()))
    }

    async fn refresh(&self) -> Result<usize, KeyStoreError> {
        Ok(self.keys.len())
    }

    async fn is_cached(&self) -> bool {
        true
    }
}
