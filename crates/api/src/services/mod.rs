//! Request-driven services that orchestrate repositories and core logic.
//!
//! - [`qrcode`] -- QR code registry, scan resolver and artifact read path.

pub mod qrcode;
