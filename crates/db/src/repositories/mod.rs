//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod batch_repo;
pub mod enterprise_repo;
pub mod product_repo;
pub mod qr_code_repo;
pub mod user_repo;

pub use batch_repo::BatchRepo;
pub use enterprise_repo::EnterpriseRepo;
pub use product_repo::ProductRepo;
pub use qr_code_repo::QrCodeRepo;
pub use user_repo::UserRepo;
