//! Course-tree domain logic shared by the store, replayer, provisioner and API.
//!
//! Nothing in this crate performs I/O.

pub mod access;
pub mod error;
pub mod mutate;
pub mod node;
pub mod path;
pub mod project_settings;
pub mod roster;
pub mod transaction;
pub mod types;
pub mod validation;
