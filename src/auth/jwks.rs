// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Behaviour
//!
//! - Keys are fetched from the realm's `protocol/openid-connect/certs`
//!   endpoint and kept in memory keyed by `kid`
//! - A lookup miss triggers a full refresh, then one more lookup
//! - A refresh replaces the whole key map or leaves it untouched on failure,
//!   so stale keys stay usable while the provider is unreachable
//! - The refresh runs on its own task: a caller that gives up waiting does
//!   not cancel it
//!
//! ## Usage
//!
//! Build one [`JwksKeyStore`] at startup and share it (as `Arc<dyn KeyStore>`)
//! with the [`TokenValidator`](super::token::TokenValidator).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::instrument;

use super::error::KeyStoreError;
use crate::config::ProviderConfig;

/// JSON Web Key as published by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for the keys we use)
    pub kty: String,

    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,

    /// Key use ("sig" or "enc")
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus (base64url, unpadded)
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url, unpadded)
    #[serde(default)]
    pub e: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

/// Source of verification keys.
///
/// Implemented by [`JwksKeyStore`] in production. Tests substitute an
/// in-memory store.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Resolve a key by id, refreshing once on a miss.
    async fn get_key(&self, kid: &str) -> Result<DecodingKey, KeyStoreError>;

    /// Re-fetch the key set. Returns the number of usable keys.
    async fn refresh(&self) -> Result<usize, KeyStoreError>;

    /// Whether a refresh has ever succeeded.
    async fn is_cached(&self) -> bool;
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    refreshed_at: Option<Instant>,
}

struct Inner {
    jwks_url: String,
    client: reqwest::Client,
    cache: RwLock<KeyCache>,
}

/// Key store backed by the realm's JWKS endpoint.
#[derive(Clone)]
pub struct JwksKeyStore {
    inner: Arc<Inner>,
}

impl JwksKeyStore {
    pub fn new(config: &ProviderConfig) -> Result<Self, KeyStoreError> {
        Self::with_url(config.jwks_url(), config)
    }

    /// Use an explicit JWKS URL instead of the realm layout.
    pub fn with_url(
        jwks_url: impl Into<String>,
        config: &ProviderConfig,
    ) -> Result<Self, KeyStoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.jwks_timeout)
            .build()
            .map_err(|e| KeyStoreError::Client(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                jwks_url: jwks_url.into(),
                client,
                cache: RwLock::new(KeyCache::default()),
            }),
        })
    }

    pub fn jwks_url(&self) -> &str {
        &self.inner.jwks_url
    }

    #[cfg(test)]
    async fn key_count(&self) -> usize {
        self.inner.cache.read().await.keys.len()
    }

    async fn cached(&self, kid: &str) -> Option<DecodingKey> {
        self.inner.cache.read().await.keys.get(kid).cloned()
    }

    /// Fetch, parse and swap in a new key map.
    #[instrument(skip(self), fields(url = %self.inner.jwks_url))]
    async fn fetch_and_replace(&self) -> Result<usize, KeyStoreError> {
        tracing::debug!(target: "auth.jwks", "Fetching JWKS");

        let response = self
            .inner
            .client
            .get(&self.inner.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "auth.jwks", error = %e, "Failed to fetch JWKS");
                KeyStoreError::Fetch(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeyStoreError::Fetch(format!(
                "status {}",
                response.status().as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "auth.jwks", error = %e, "Failed to read JWKS body");
            KeyStoreError::Fetch(e.to_string())
        })?;

        let document: JwksDocument = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "auth.jwks", error = %e, "Failed to parse JWKS response");
            KeyStoreError::Parse(e.to_string())
        })?;

        let keys = build_key_map(document);
        let count = keys.len();

        {
            let mut cache = self.inner.cache.write().await;
            *cache = KeyCache {
                keys,
                refreshed_at: Some(Instant::now()),
            };
        }

        tracing::info!(target: "auth.jwks", key_count = count, "JWKS cache refreshed");
        Ok(count)
    }
}

#[async_trait]
impl KeyStore for JwksKeyStore {
    #[instrument(skip(self), fields(kid = %kid))]
    async fn get_key(&self, kid: &str) -> Result<DecodingKey, KeyStoreError> {
        if let Some(key) = self.cached(kid).await {
            tracing::debug!(target: "auth.jwks", "JWKS cache hit");
            return Ok(key);
        }

        tracing::debug!(target: "auth.jwks", "Key not cached, refreshing JWKS");
        self.refresh().await?;

        match self.cached(kid).await {
            Some(key) => Ok(key),
            None => {
                tracing::warn!(target: "auth.jwks", "Key not found in JWKS after refresh");
                Err(KeyStoreError::NotFound(kid.to_string()))
            }
        }
    }

    async fn refresh(&self) -> Result<usize, KeyStoreError> {
        // Dropping this future must not abort the fetch.
        let store = self.clone();
        tokio::spawn(async move { store.fetch_and_replace().await })
            .await
            .map_err(|e| KeyStoreError::Fetch(format!("refresh task failed: {e}")))?
    }

    async fn is_cached(&self) -> bool {
        self.inner.cache.read().await.refreshed_at.is_some()
    }
}

/// Build the `kid → key` map from a document, skipping unusable entries.
fn build_key_map(document: JwksDocument) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::with_capacity(document.keys.len());

    for jwk in document.keys {
        let Some(kid) = jwk.kid.clone() else {
            tracing::debug!(target: "auth.jwks", kty = %jwk.kty, "Skipping JWK without kid");
            continue;
        };

        match rsa_decoding_key(&jwk) {
            Ok(key) => {
                keys.insert(kid, key);
            }
            Err(reason) => {
                tracing::debug!(target: "auth.jwks", kid = %kid, reason, "Skipping JWK");
            }
        }
    }

    keys
}

/// Reconstruct an RSA public key from the JWK's modulus and exponent.
fn rsa_decoding_key(jwk: &Jwk) -> Result<DecodingKey, &'static str> {
    if jwk.kty != "RSA" {
        return Err("unsupported key type");
    }

    let n = jwk.n.as_deref().ok_or("missing modulus")?;
    let e = jwk.e.as_deref().ok_or("missing exponent")?;

    let modulus = URL_SAFE_NO_PAD
        .decode(n)
        .map_err(|_| "modulus is not base64url")?;
    let exponent = URL_SAFE_NO_PAD
        .decode(e)
        .map_err(|_| "exponent is not base64url")?;

    if modulus.is_empty() || exponent.is_empty() {
        return Err("empty key component");
    }

    Ok(DecodingKey::from_rsa_raw_components(&modulus, &exponent))
}
