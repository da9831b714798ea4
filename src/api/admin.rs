// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! Mounted behind `require_role("admin")`; the role may be granted at realm
//! level or on any client.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AdminRole, RequireRole, RoleSet};

/// Admin session summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSessionResponse {
    pub user_id: String,
    pub username: String,
    /// Client that requested the token (`azp`)
    pub client_id: String,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
    pub roles: RoleSet,
}

/// Describe the admin session of the caller.
#[utoipa::path(
    get,
    path = "/v1/admin/session",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Admin session", body = AdminSessionResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn get_session(
    RequireRole(identity, _): RequireRole<AdminRole>,
) -> Json<AdminSessionResponse> {
    let claims = identity.claims();
    Json(AdminSessionResponse {
        user_id: identity.subject.clone(),
        username: identity.username.clone(),
        client_id: claims.azp.clone(),
        expires_at: claims.exp,
        roles: identity.roles().clone(),
    })
}
