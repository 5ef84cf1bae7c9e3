//! # ferry-keycloak
//!
//! Talks to the Keycloak admin REST API over `reqwest`:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | token | `POST {base}/realms/{realm}/protocol/openid-connect/token` |
//! | create user | `POST {base}/admin/realms/{realm}/users` |
//! | get role | `GET {base}/admin/realms/{realm}/roles/{name}` |
//! | create role | `POST {base}/admin/realms/{realm}/roles` |
//! | map roles | `POST {base}/admin/realms/{realm}/users/{id}/role-mappings/realm` |
//! | password | `PUT {base}/admin/realms/{realm}/users/{id}/reset-password` |

pub mod client;
pub mod error;

pub use client::{KeycloakClient, user_agent};
pub use error::ClientError;
