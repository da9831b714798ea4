// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity.subject is the Keycloak user id
//! }
//! ```
//!
//! When a [`require_auth`](super::middleware::require_auth) layer already ran,
//! the extractor reuses the identity it published instead of validating the
//! token again.

use std::convert::Infallible;
use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::claims::Identity;
use super::error::AuthError;
use super::middleware::AuthGuard;
use super::roles::RequiredRole;

/// Extractor for authenticated users.
pub struct Auth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    AuthGuard: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = AuthGuard::from_ref(state);
        let identity = guard.identity_for(parts).await?;
        parts.extensions.insert(identity.clone());
        Ok(Auth(identity))
    }
}

/// Extractor that requires the role named by `R`.
///
/// # Example
///
/// ```rust,ignore
/// async fn admin_only(RequireRole(identity, _): RequireRole<AdminRole>) -> impl IntoResponse {
///     // Only realm or client admins reach here
/// }
/// ```
pub struct RequireRole<R: RequiredRole>(pub Identity, pub PhantomData<R>);

impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    AuthGuard: FromRef<S>,
    S: Send + Sync,
    R: RequiredRole,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;
        AuthGuard::authorize(&identity, R::NAME)?;
        Ok(RequireRole(identity, PhantomData))
    }
}

/// Optional authentication extractor.
///
/// Yields `None` instead of rejecting when the request is not authenticated.
pub struct OptionalAuth(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AuthGuard: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(identity)) => Ok(OptionalAuth(Some(identity))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}
