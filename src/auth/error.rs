// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! The key store and the validator return structured errors. Only
//! [`AuthError`] knows about HTTP; it is produced at the guard boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Key store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyStoreError {
    /// JWKS endpoint unreachable or returned a non-success status.
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),
    /// JWKS body is not a valid key set document.
    #[error("failed to decode JWKS: {0}")]
    Parse(String),
    /// HTTP client for the JWKS endpoint could not be built.
    #[error("failed to build JWKS client: {0}")]
    Client(String),
    /// Key id absent from the current (possibly just refreshed) key set.
    #[error("key with kid {0} not found")]
    NotFound(String),
}

/// Which registered claim check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimFailure {
    Expired,
    Issuer,
    Audience,
}

impl ClaimFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ClaimFailure::Expired => "expired",
            ClaimFailure::Issuer => "issuer",
            ClaimFailure::Audience => "audience",
        }
    }
}

impl std::fmt::Display for ClaimFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Token validation failures. Variants are mutually exclusive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Token is not a well-formed compact JWT, or its header lacks `kid`.
    #[error("failed to parse token: {0}")]
    Parse(String),
    /// Keys could not be fetched while resolving the `kid`.
    #[error("failed to get public key: {0}")]
    Fetch(String),
    /// The JWKS document fetched while resolving the `kid` is malformed.
    #[error("invalid JWKS: {0}")]
    KeySetInvalid(String),
    /// No published key matches the token's `kid`.
    #[error("no published key for kid {kid}")]
    KeyResolution { kid: String },
    /// Signature did not verify, or the algorithm is not RSA.
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("invalid claim: {0}")]
    ClaimInvalid(ClaimFailure),
}

impl From<KeyStoreError> for ValidationError {
    fn from(err: KeyStoreError) -> Self {
        match err {
            KeyStoreError::NotFound(kid) => ValidationError::KeyResolution { kid },
            KeyStoreError::Fetch(msg) | KeyStoreError::Client(msg) => ValidationError::Fetch(msg),
            KeyStoreError::Parse(msg) => ValidationError::KeySetInvalid(msg),
        }
    }
}

/// Why a request was not authenticated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    #[error("missing header")]
    MissingHeader,
    #[error("malformed header")]
    MalformedHeader,
    #[error(transparent)]
    InvalidToken(#[from] ValidationError),
}

/// Guard outcome for a rejected request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Mapped to 401.
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] UnauthenticatedReason),
    /// Authenticated, but the required role is missing. Mapped to 403.
    #[error("role '{0}' is required")]
    Unauthorized(String),
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Unauthenticated(UnauthenticatedReason::InvalidToken(err))
    }
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    error_code: &'static str,
}

impl AuthError {
    /// Client-visible error code. All token failures share `invalid_token`.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated(UnauthenticatedReason::MissingHeader) => {
                "missing_auth_header"
            }
            AuthError::Unauthenticated(UnauthenticatedReason::MalformedHeader) => {
                "invalid_auth_header"
            }
            AuthError::Unauthenticated(UnauthenticatedReason::InvalidToken(_)) => "invalid_token",
            AuthError::Unauthorized(_) => "insufficient_permissions",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthError::Unauthorized(_) => StatusCode::FORBIDDEN,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated(UnauthenticatedReason::MissingHeader) => {
                "Authorization header is required"
            }
            AuthError::Unauthenticated(UnauthenticatedReason::MalformedHeader) => {
                "Invalid authorization header format (expected 'Bearer <token>')"
            }
            AuthError::Unauthenticated(UnauthenticatedReason::InvalidToken(_)) => "Invalid token",
            AuthError::Unauthorized(_) => "Insufficient permissions for this operation",
        }
    }

    /// Write the detailed reason to the internal log.
    fn log(&self) {
        match self {
            AuthError::Unauthenticated(UnauthenticatedReason::InvalidToken(
                ValidationError::SignatureInvalid,
            )) => {
                tracing::warn!(target: "auth.guard", "Rejected token with invalid signature (possible tampering)");
            }
            AuthError::Unauthenticated(UnauthenticatedReason::InvalidToken(
                err @ (ValidationError::Fetch(_) | ValidationError::KeySetInvalid(_)),
            )) => {
                tracing::error!(target: "auth.guard", error = %err, "Token rejected, signing keys unavailable");
            }
            AuthError::Unauthenticated(reason) => {
                tracing::info!(target: "auth.guard", reason = %reason, "Request not authenticated");
            }
            AuthError::Unauthorized(role) => {
                tracing::info!(target: "auth.guard", required_role = %role, "Request lacks required role");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.client_message(),
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
