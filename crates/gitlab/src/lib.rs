//! Materializes course trees on a GitLab instance.
//!
//! [`platform::Platform`] is the seam between the provisioning walk and
//! the hosting platform; [`api::GitLabApi`] implements it over the GitLab
//! REST API. [`provisioner::Provisioner`] walks a canonical tree and makes
//! sure every group, project and user exists remotely, retrying transient
//! upstream failures with [`retry::RetryPolicy`].

pub mod api;
pub mod error;
pub mod platform;
pub mod provisioner;
pub mod retry;

pub use api::GitLabApi;
pub use error::{PlatformError, ProvisionError};
pub use platform::Platform;
pub use provisioner::Provisioner;
pub use retry::RetryPolicy;
