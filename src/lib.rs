// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! FeedbackLab Auth - Keycloak JWT authentication for Axum services
//!
//! This crate verifies access tokens issued by a Keycloak realm and gates
//! HTTP handlers on realm and client roles.
//!
//! ## Modules
//!
//! - `auth` - JWKS key store, token validator, claims, guard middleware and extractors
//! - `api` - HTTP API handlers (Axum)
//! - `config` - Environment configuration
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod state;
