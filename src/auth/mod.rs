// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Keycloak JWT authentication and role authorization.
//!
//! ## Auth Flow
//!
//! 1. The client authenticates against the Keycloak realm
//! 2. The client sends `Authorization: Bearer <access token>`
//! 3. The server:
//!    - Peeks the unverified token header for its `kid`
//!    - Resolves the key from the realm JWKS (fetched on a cache miss)
//!    - Verifies the RS256 signature, expiry, issuer and audience
//!    - Publishes an [`Identity`] (`sub`, email, username, roles) for the
//!      handlers of this request
//! 4. Role-gated routes additionally check realm and client roles
//!
//! ## Security
//!
//! - Only RSA-signed tokens are accepted
//! - Issuer must be exactly `{KEYCLOAK_URL}/realms/{KEYCLOAK_REALM}`
//! - Clock skew tolerance defaults to 60 seconds
//! - Clients only ever see a generic 401/403 body; reasons go to the logs

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod roles;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::{Claims, Identity, IdentityResponse};
pub use error::{AuthError, ClaimFailure, KeyStoreError, UnauthenticatedReason, ValidationError};
pub use extractor::{Auth, OptionalAuth, RequireRole};
pub use jwks::{JwksKeyStore, KeyStore};
pub use middleware::{require_auth, require_role, AuthGuard};
pub use roles::{AdminRole, RequiredRole, RoleSet};
pub use token::TokenValidator;
