// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! [`require_auth`] and [`require_role`] guard whole router subtrees. On
//! success the caller's [`Identity`] is inserted into the request extensions,
//! where handlers pick it up through the [`Auth`](super::extractor::Auth)
//! extractor.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(axum::middleware::from_fn_with_state(guard.clone(), require_auth))
//!     .route("/admin", get(admin))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         guard.require("admin"),
//!         require_role,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::claims::Identity;
use super::error::{AuthError, UnauthenticatedReason};
use super::token::TokenValidator;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is case-sensitive and must be followed by exactly one space.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, UnauthenticatedReason> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(UnauthenticatedReason::MissingHeader)?
        .to_str()
        .map_err(|_| UnauthenticatedReason::MalformedHeader)?;

    if value.is_empty() {
        return Err(UnauthenticatedReason::MissingHeader);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(UnauthenticatedReason::MalformedHeader),
    }
}

/// Request-boundary adapter around the [`TokenValidator`].
#[derive(Clone)]
pub struct AuthGuard {
    validator: Arc<TokenValidator>,
}

impl AuthGuard {
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Validate the bearer token in `headers` and build the identity.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = bearer_token(headers)?;
        let claims = self.validator.validate(token).await?;
        let identity = Identity::from_claims(claims);

        tracing::debug!(target: "auth.guard", sub = %identity.subject, "Request authenticated");
        Ok(identity)
    }

    /// Fail with `Unauthorized` unless `identity` holds `role`.
    pub fn authorize(identity: &Identity, role: &str) -> Result<(), AuthError> {
        if identity.has_role(role) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized(role.to_string()))
        }
    }

    /// State for [`require_role`].
    pub fn require(&self, role: impl Into<Arc<str>>) -> RoleRequirement {
        RoleRequirement {
            guard: self.clone(),
            role: role.into(),
        }
    }

    /// Identity already published by an outer layer, or a fresh one.
    pub(crate) async fn identity_for(&self, parts: &Parts) -> Result<Identity, AuthError> {
        match parts.extensions.get::<Identity>() {
            Some(identity) => Ok(identity.clone()),
            None => self.authenticate(&parts.headers).await,
        }
    }
}

/// A guard bound to one required role.
#[derive(Clone)]
pub struct RoleRequirement {
    guard: AuthGuard,
    role: Arc<str>,
}

impl RoleRequirement {
    pub fn role(&self) -> &str {
        &self.role
    }
}

/// Authentication middleware function.
pub async fn require_auth(
    State(guard): State<AuthGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();
    let identity = guard.identity_for(&parts).await?;
    parts.extensions.insert(identity);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Authentication plus role membership middleware function.
pub async fn require_role(
    State(requirement): State<RoleRequirement>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();
    let identity = requirement.guard.identity_for(&parts).await?;
    AuthGuard::authorize(&identity, requirement.role())?;

    parts.extensions.insert(identity);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
