//! REST client for the GitLab v4 API.
//!
//! Wraps the endpoints the provisioner needs (groups, projects, push rules,
//! users and memberships) using [`reqwest`]. Namespaced paths such as
//! `CS101/2024` are sent as a single percent-encoded path segment.

use async_trait::async_trait;
use quicklab_core::access::AccessLevel;
use quicklab_core::project_settings::PushRules;
use quicklab_core::types::RemoteId;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Url};
use serde_json::json;

use crate::error::PlatformError;
use crate::platform::{
    GroupSpec, MemberTarget, Platform, ProjectSource, ProjectSpec, RemoteGroup, RemoteProject,
    RemoteUser, UserSpec,
};

/// Authenticated client for a single GitLab instance.
pub struct GitLabApi {
    client: reqwest::Client,
    web_url: Url,
    api_url: Url,
    token: String,
    reset_password: bool,
}

impl GitLabApi {
    /// Create a client for the instance at `base_url`, e.g. `https://gitlab.com`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, PlatformError> {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        token: impl Into<String>,
    ) -> Result<Self, PlatformError> {
        let web_url = Url::parse(base_url)
            .map_err(|e| PlatformError::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut api_url = web_url.clone();
        api_url
            .path_segments_mut()
            .map_err(|_| PlatformError::InvalidUrl(base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v4"]);

        Ok(Self {
            client,
            web_url,
            api_url,
            token: token.into(),
            reset_password: true,
        })
    }

    /// Whether created accounts receive a password-reset mail.
    pub fn with_reset_password(mut self, reset_password: bool) -> Self {
        self.reset_password = reset_password;
        self
    }

    // ---- private helpers ----

    /// API URL for the given path segments, each percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn members_endpoint(&self, target: MemberTarget, extra: Option<&str>) -> Url {
        let kind = match target {
            MemberTarget::Group(_) => "groups",
            MemberTarget::Project(_) => "projects",
        };
        let id = target.id().to_string();
        match extra {
            Some(user) => self.endpoint(&[kind, &id, "members", user]),
            None => self.endpoint(&[kind, &id, "members"]),
        }
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        tracing::debug!(%method, %url, "GitLab request");
        self.client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }

    /// Ensure the response has a success status code, classifying the
    /// failure otherwise.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PlatformError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PlatformError::from_status(status.as_u16(), body));
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), PlatformError> {
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn find_user(&self, key: &str, value: &str) -> Result<Option<RemoteUser>, PlatformError> {
        let response = self
            .request(Method::GET, self.endpoint(&["users"]))
            .query(&[(key, value)])
            .send()
            .await?;
        let users: Vec<RemoteUser> = Self::parse_response(response).await?;
        Ok(users.into_iter().next())
    }

    async fn delete(&self, kind: &str, id: RemoteId) -> Result<(), PlatformError> {
        let id = id.to_string();
        let response = self
            .request(Method::DELETE, self.endpoint(&[kind, &id]))
            .send()
            .await?;
        Self::check_status(response).await
    }
}

#[async_trait]
impl Platform for GitLabApi {
    fn web_url(&self) -> String {
        self.web_url.as_str().trim_end_matches('/').to_string()
    }

    async fn get_group(&self, full_path: &str) -> Result<RemoteGroup, PlatformError> {
        let response = self
            .request(Method::GET, self.endpoint(&["groups", full_path]))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn create_group(&self, spec: &GroupSpec) -> Result<RemoteGroup, PlatformError> {
        let body = json!({
            "name": spec.name,
            "path": spec.path,
            "parent_id": spec.parent_id,
            "description": spec.description,
            "visibility": "private",
        });
        let response = self
            .request(Method::POST, self.endpoint(&["groups"]))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn delete_group(&self, id: RemoteId) -> Result<(), PlatformError> {
        self.delete("groups", id).await
    }

    async fn get_project(&self, full_path: &str) -> Result<RemoteProject, PlatformError> {
        let response = self
            .request(Method::GET, self.endpoint(&["projects", full_path]))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Empty and URL-seeded projects go through `POST /projects`; archives
    /// are uploaded to `POST /projects/import`.
    async fn create_project(&self, spec: &ProjectSpec) -> Result<RemoteProject, PlatformError> {
        let request = match &spec.source {
            ProjectSource::Empty => self
                .request(Method::POST, self.endpoint(&["projects"]))
                .json(&json!({
                    "name": spec.name,
                    "path": spec.name,
                    "namespace_id": spec.namespace_id,
                    "jobs_enabled": false,
                })),
            ProjectSource::Url(import_url) => self
                .request(Method::POST, self.endpoint(&["projects"]))
                .json(&json!({
                    "name": spec.name,
                    "path": spec.name,
                    "namespace_id": spec.namespace_id,
                    "import_url": import_url,
                })),
            ProjectSource::Archive { file_name, data } => {
                let form = Form::new()
                    .text("name", spec.name.clone())
                    .text("path", spec.name.clone())
                    .text("namespace", spec.namespace_id.to_string())
                    .text("overwrite", "true")
                    .part("file", Part::bytes(data.to_vec()).file_name(file_name.clone()));
                self.request(Method::POST, self.endpoint(&["projects", "import"]))
                    .multipart(form)
            }
        };
        let response = request.send().await?;
        Self::parse_response(response).await
    }

    async fn delete_project(&self, id: RemoteId) -> Result<(), PlatformError> {
        self.delete("projects", id).await
    }

    async fn set_push_rules(
        &self,
        project: RemoteId,
        rules: &PushRules,
    ) -> Result<(), PlatformError> {
        let id = project.to_string();
        let response = self
            .request(Method::POST, self.endpoint(&["projects", &id, "push_rule"]))
            .json(rules)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<RemoteUser>, PlatformError> {
        self.find_user("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<RemoteUser>, PlatformError> {
        self.find_user("search", email).await
    }

    async fn create_user(&self, spec: &UserSpec) -> Result<RemoteUser, PlatformError> {
        let body = json!({
            "email": spec.email,
            "name": spec.name,
            "username": spec.username,
            "reset_password": self.reset_password,
        });
        let response = self
            .request(Method::POST, self.endpoint(&["users"]))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn delete_user(&self, id: RemoteId) -> Result<(), PlatformError> {
        self.delete("users", id).await
    }

    async fn add_member(
        &self,
        target: MemberTarget,
        user: RemoteId,
        level: AccessLevel,
    ) -> Result<(), PlatformError> {
        let body = json!({
            "user_id": user,
            "access_level": level.as_u8(),
        });
        let response = self
            .request(Method::POST, self.members_endpoint(target, None))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn remove_member(
        &self,
        target: MemberTarget,
        user: RemoteId,
    ) -> Result<(), PlatformError> {
        let user = user.to_string();
        let response = self
            .request(Method::DELETE, self.members_endpoint(target, Some(&user)))
            .send()
            .await?;
        Self::check_status(response).await
    }
}
