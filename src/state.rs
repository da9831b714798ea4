// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthGuard, JwksKeyStore, KeyStore, KeyStoreError, TokenValidator};
use crate::config::ProviderConfig;

#[derive(Clone)]
pub struct AppState {
    pub guard: AuthGuard,
}

impl AppState {
    pub fn new(key_store: Arc<dyn KeyStore>, provider: ProviderConfig) -> Self {
        let validator = TokenValidator::new(key_store, provider);
        Self {
            guard: AuthGuard::new(Arc::new(validator)),
        }
    }

    /// State backed by the realm's JWKS endpoint.
    pub fn from_provider(provider: ProviderConfig) -> Result<Self, KeyStoreError> {
        let key_store = Arc::new(JwksKeyStore::new(&provider)?);
        Ok(Self::new(key_store, provider))
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        self.guard.validator().key_store()
    }
}

impl FromRef<AppState> for AuthGuard {
    fn from_ref(state: &AppState) -> Self {
        state.guard.clone()
    }
}
