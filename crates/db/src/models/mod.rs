//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` struct matching the database row
//! - A `Deserialize` create DTO for inserts

pub mod available_ta;
pub mod group;
pub mod project_settings;
pub mod repository;
pub mod user;
