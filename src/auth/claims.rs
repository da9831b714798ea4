// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated identity representation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use super::roles::RoleSet;

/// Claims of a Keycloak access token.
///
/// Keycloak tokens carry the standard registered claims plus profile fields
/// and the realm/client role containers.
/// See: https://www.keycloak.org/docs/latest/server_admin/#_oidc_token_and_userinfo_endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default)]
    pub preferred_username: String,

    #[serde(default)]
    pub given_name: String,

    #[serde(default)]
    pub family_name: String,

    /// Authorized party (client that requested the token)
    #[serde(default)]
    pub azp: String,

    #[serde(default)]
    pub realm_access: RealmAccess,

    /// Roles keyed by client/resource name
    #[serde(default)]
    pub resource_access: HashMap<String, ResourceAccess>,

    /// Issuer (`{base_url}/realms/{realm}`)
    #[serde(default)]
    pub iss: String,

    /// Audience. Keycloak sends either a string or an array.
    #[serde(default, deserialize_with = "string_or_seq")]
    pub aud: Vec<String>,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null,
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(auds) => auds,
        OneOrMany::Null => Vec::new(),
    })
}

impl Claims {
    /// Flatten realm and resource role containers into a [`RoleSet`].
    pub fn role_set(&self) -> RoleSet {
        RoleSet::new(
            self.realm_access.roles.iter().cloned(),
            self.resource_access
                .iter()
                .map(|(resource, access)| (resource.clone(), access.roles.clone())),
        )
    }
}

/// Authenticated identity published into request extensions.
///
/// This is the primary type handlers use to learn who is calling. It lives
/// only as long as the request.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Canonical user ID (`sub` claim)
    pub subject: String,
    pub email: String,
    /// Keycloak `preferred_username`
    pub username: String,
    roles: RoleSet,
    claims: Arc<Claims>,
}

impl Identity {
    /// Create from verified claims.
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            username: claims.preferred_username.clone(),
            roles: claims.role_set(),
            claims: Arc::new(claims),
        }
    }

    /// Check if the user has `role` at realm level or on any resource.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Full verified claims.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Identity as returned to API clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IdentityResponse {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub given_name: String,
    pub family_name: String,
    pub email_verified: bool,
    pub roles: RoleSet,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        let claims = identity.claims();
        Self {
            user_id: identity.subject.clone(),
            email: identity.email.clone(),
            username: identity.username.clone(),
            given_name: claims.given_name.clone(),
            family_name: claims.family_name.clone(),
            email_verified: claims.email_verified,
            roles: identity.roles().clone(),
        }
    }
}
