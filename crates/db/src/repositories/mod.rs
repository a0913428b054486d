//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&SqlitePool` as the first argument.

pub mod available_ta_repo;
pub mod group_repo;
pub mod project_settings_repo;
pub mod repository_repo;
pub mod user_repo;

pub use available_ta_repo::AvailableTaRepo;
pub use group_repo::GroupRepo;
pub use project_settings_repo::ProjectSettingsRepo;
pub use repository_repo::RepositoryRepo;
pub use user_repo::UserRepo;
