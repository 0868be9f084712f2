//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`rbac::RequireProducer`] -- Requires `producer` or `admin` role.
//!
//! Batch ownership is not decided here; handlers hand the caller to the QR
//! service as an explicit [`tracecode_core::roles::Actor`].

pub mod auth;
pub mod rbac;
