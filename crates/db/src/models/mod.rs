//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts

pub mod batch;
pub mod enterprise;
pub mod product;
pub mod qr_code;
pub mod user;
