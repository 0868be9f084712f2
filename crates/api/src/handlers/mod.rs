//! Request handlers.
//!
//! Handlers extract the caller and request data, delegate to
//! [`crate::services::qrcode::QrCodeService`] and map errors via
//! [`crate::error::AppError`].

pub mod batch;
pub mod qrcode;
