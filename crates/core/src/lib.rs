//! Domain logic for traceability QR codes.
//!
//! Nothing in this crate touches the database. Persistence lives in
//! `tracecode-db`; HTTP wiring lives in `tracecode-api`.

pub mod artifact;
pub mod error;
pub mod hashing;
pub mod qr_status;
pub mod render;
pub mod roles;
pub mod token;
pub mod traceability;
pub mod types;
