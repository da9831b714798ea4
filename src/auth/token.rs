// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token validation.
//!
//! Validation is split in two steps:
//!
//! 1. [`peek_header`] decodes the token without trusting it, only to learn
//!    which key signed it.
//! 2. [`verify_token`] checks the signature with the resolved key and then
//!    the registered claims.
//!
//! [`TokenValidator`] chains both with a [`KeyStore`] lookup in between.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Header, Validation};

use super::claims::Claims;
use super::error::{ClaimFailure, ValidationError};
use super::jwks::KeyStore;
use crate::config::ProviderConfig;

/// RSA PKCS#1 v1.5 algorithms accepted in the token header.
const RSA_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Header fields read before the signature is checked. Untrusted.
#[derive(Debug, Clone)]
pub struct UnverifiedHeader {
    pub kid: String,
    pub alg: Algorithm,
}

/// Decode header and payload without verifying the signature.
///
/// Fails if the token is not three base64url segments with JSON header and
/// payload, or if the header carries no `kid`.
pub fn peek_header(token: &str) -> Result<UnverifiedHeader, ValidationError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<serde_json::Value>(token)
        .map_err(|e| ValidationError::Parse(e.to_string()))?;

    if !data.claims.is_object() {
        return Err(ValidationError::Parse("payload is not a JSON object".to_string()));
    }

    let Header { kid, alg, .. } = data.header;
    let kid = kid.ok_or_else(|| ValidationError::Parse("kid not found in token header".to_string()))?;

    Ok(UnverifiedHeader { kid, alg })
}

/// Verify signature and registered claims of `token` with `key`.
pub fn verify_token(
    token: &str,
    key: &DecodingKey,
    config: &ProviderConfig,
) -> Result<Claims, ValidationError> {
    let header =
        jsonwebtoken::decode_header(token).map_err(|e| ValidationError::Parse(e.to_string()))?;
    if !RSA_ALGORITHMS.contains(&header.alg) {
        tracing::warn!(target: "auth.token", alg = ?header.alg, "Unexpected signing method");
        return Err(ValidationError::SignatureInvalid);
    }

    let mut validation = Validation::new(header.alg);
    validation.algorithms = RSA_ALGORITHMS.to_vec();
    // No grace on `exp`; clock skew only applies to `iat` below.
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "iss"]);
    validation.set_issuer(&[config.issuer()]);
    // Audience follows the client/azp rule below, not the library's.
    validation.validate_aud = false;

    let claims = decode::<Claims>(token, key, &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidKeyFormat => ValidationError::SignatureInvalid,
            // Header and payload already decoded in the peek; only the
            // signature segment can fail to decode here.
            ErrorKind::Base64(_) => ValidationError::SignatureInvalid,
            ErrorKind::MissingRequiredClaim(claim) if claim == "iss" => {
                ValidationError::ClaimInvalid(ClaimFailure::Issuer)
            }
            ErrorKind::ExpiredSignature
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => {
                ValidationError::ClaimInvalid(ClaimFailure::Expired)
            }
            ErrorKind::InvalidIssuer => ValidationError::ClaimInvalid(ClaimFailure::Issuer),
            ErrorKind::InvalidAudience => ValidationError::ClaimInvalid(ClaimFailure::Audience),
            _ => ValidationError::Parse(e.to_string()),
        })?
        .claims;

    let now = jsonwebtoken::get_current_timestamp() as i64;
    if claims.iat > now + config.clock_skew.as_secs() as i64 {
        return Err(ValidationError::ClaimInvalid(ClaimFailure::Expired));
    }

    if !audience_accepted(&claims, config) {
        return Err(ValidationError::ClaimInvalid(ClaimFailure::Audience));
    }

    Ok(claims)
}

/// Client id in `aud`, or client id as `azp`, or (if allowed) empty `aud`.
fn audience_accepted(claims: &Claims, config: &ProviderConfig) -> bool {
    claims.aud.iter().any(|aud| *aud == config.client_id)
        || (!claims.azp.is_empty() && claims.azp == config.client_id)
        || (claims.aud.is_empty() && config.allow_empty_audience)
}

/// Validates bearer tokens issued by the configured realm.
pub struct TokenValidator {
    keys: Arc<dyn KeyStore>,
    config: ProviderConfig,
}

impl TokenValidator {
    pub fn new(keys: Arc<dyn KeyStore>, config: ProviderConfig) -> Self {
        Self { keys, config }
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.keys
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Parse, resolve the signing key, verify. Returns the decoded claims.
    pub async fn validate(&self, token: &str) -> Result<Claims, ValidationError> {
        let header = peek_header(token)?;
        let key = self.keys.get_key(&header.kid).await?;
        let claims = verify_token(token, &key, &self.config)?;

        tracing::debug!(
            target: "auth.token",
            kid = %header.kid,
            alg = ?header.alg,
            sub = %claims.sub,
            "Token validated"
        );
        Ok(claims)
    }
}
