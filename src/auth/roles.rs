// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role membership for authorization.
//!
//! Keycloak publishes roles in two places: realm roles under
//! `realm_access.roles` and per-client roles under
//! `resource_access.<client>.roles`. [`RoleSet`] holds both and answers a
//! single question: is this role granted anywhere?

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use utoipa::ToSchema;

/// Realm and per-resource roles of an authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoleSet {
    /// Roles granted at realm level
    pub realm_roles: BTreeSet<String>,
    /// Roles granted per client/resource
    pub resource_roles: BTreeMap<String, BTreeSet<String>>,
}

impl RoleSet {
    pub fn new<R, I, S>(realm_roles: R, resource_roles: I) -> Self
    where
        R: IntoIterator<Item = S>,
        I: IntoIterator<Item = (String, Vec<S>)>,
        S: Into<String>,
    {
        Self {
            realm_roles: realm_roles.into_iter().map(Into::into).collect(),
            resource_roles: resource_roles
                .into_iter()
                .map(|(resource, roles)| (resource, roles.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// True if `role` is a realm role or a role of any resource.
    pub fn contains(&self, role: &str) -> bool {
        self.realm_roles.contains(role)
            || self
                .resource_roles
                .values()
                .any(|roles| roles.contains(role))
    }

    pub fn is_empty(&self) -> bool {
        self.realm_roles.is_empty() && self.resource_roles.values().all(BTreeSet::is_empty)
    }
}

/// A role required by an extractor, named at compile time.
pub trait RequiredRole {
    const NAME: &'static str;
}

/// Realm administrator.
pub struct AdminRole;

impl RequiredRole for AdminRole {
    const NAME: &'static str = "admin";
}
