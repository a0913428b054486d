//! Handlers for the `/courses` resource.
//!
//! Courses are imported as whole trees and edited afterwards through the
//! transaction log of a single edition. Provisioning reads the stored
//! edition and its project settings, never a tree sent by the client.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quicklab_core::node::Node;
use quicklab_core::project_settings::ProjectDefaults;
use quicklab_core::roster::TaRoster;
use quicklab_core::transaction::RawTransaction;
use quicklab_db::models::group::GroupSelector;
use quicklab_db::store::CourseSummary;
use quicklab_sync::ReplayOutcome;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewEdition {
    pub name: String,
}

/// Body of a transaction replay request.
#[derive(Debug, Deserialize)]
pub struct SaveTransactions {
    pub log: Vec<RawTransaction>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    /// Web URL of the provisioned edition.
    pub url: String,
}

/// GET /api/v1/courses
pub async fn list_courses(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<CourseSummary>>>> {
    let courses = state.store.list_courses().await?;
    Ok(Json(DataResponse { data: courses }))
}

/// POST /api/v1/courses
///
/// Store a full course tree. Existing groups keep their identity; an
/// edition present in the body replaces the stored one.
pub async fn import_course(
    State(state): State<AppState>,
    Json(tree): Json<Node>,
) -> AppResult<(StatusCode, Json<DataResponse<Node>>)> {
    let row = state.store.import_course(&tree).await?;
    let stored = state.store.get_all_groups(&GroupSelector::Id(row.id)).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: stored })))
}

/// POST /api/v1/courses/{course}/editions
pub async fn add_edition(
    State(state): State<AppState>,
    Path(course): Path<String>,
    Json(input): Json<NewEdition>,
) -> AppResult<(StatusCode, Json<DataResponse<Node>>)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Edition name must not be empty".to_string()));
    }
    state.store.add_edition(&course, name).await?;
    let tree = state.store.load_edition(&course, name).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: tree })))
}

/// GET /api/v1/courses/{course}/editions/{edition}
pub async fn get_edition(
    State(state): State<AppState>,
    Path((course, edition)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Node>>> {
    let tree = state.store.load_edition(&course, &edition).await?;
    Ok(Json(DataResponse { data: tree }))
}

/// POST /api/v1/courses/{course}/editions/{edition}/transactions
///
/// Replays the log in order. When an entry fails the response carries the
/// error together with the stored tree under `result`.
pub async fn save_transactions(
    State(state): State<AppState>,
    Path((course, edition)): Path<(String, String)>,
    Json(input): Json<SaveTransactions>,
) -> AppResult<Json<DataResponse<ReplayOutcome>>> {
    let kinds: Vec<&str> = input.log.iter().map(|t| t.kind.as_str()).collect();
    tracing::info!(%course, %edition, log = ?kinds, "Saving transactions");

    let outcome = state.replayer.replay(&course, &edition, &input.log).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/courses/{course}/editions/{edition}/provision
///
/// Creates whatever is missing on GitLab and returns the edition URL.
/// A failure leaves already created resources in place.
pub async fn provision(
    State(state): State<AppState>,
    Path((course, edition)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<ProvisionResponse>>> {
    let tree = state.store.load_edition(&course, &edition).await?;
    let defaults = state
        .store
        .get_project_settings(&course, &edition)
        .await?
        .unwrap_or_default();

    let url = state.provisioner.provision(&tree, &defaults).await?;
    Ok(Json(DataResponse {
        data: ProvisionResponse { url },
    }))
}

/// GET /api/v1/courses/{course}/editions/{edition}/project-settings
///
/// Editions without stored settings report the defaults.
pub async fn get_project_settings(
    State(state): State<AppState>,
    Path((course, edition)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<ProjectDefaults>>> {
    let settings = state
        .store
        .get_project_settings(&course, &edition)
        .await?
        .unwrap_or_default();
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/courses/{course}/editions/{edition}/project-settings
pub async fn put_project_settings(
    State(state): State<AppState>,
    Path((course, edition)): Path<(String, String)>,
    Json(input): Json<ProjectDefaults>,
) -> AppResult<Json<DataResponse<ProjectDefaults>>> {
    let stored = state
        .store
        .put_project_settings(&course, &edition, &input)
        .await?;
    Ok(Json(DataResponse { data: stored }))
}

/// GET /api/v1/courses/{course}/editions/{edition}/tas
pub async fn get_available_tas(
    State(state): State<AppState>,
    Path((course, edition)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<TaRoster>>> {
    let roster = state.store.get_available_tas(&course, &edition).await?;
    Ok(Json(DataResponse { data: roster }))
}

/// PUT /api/v1/courses/{course}/editions/{edition}/tas
///
/// Replace the roster. Head TAs are also made members of the edition.
pub async fn put_available_tas(
    State(state): State<AppState>,
    Path((course, edition)): Path<(String, String)>,
    Json(input): Json<TaRoster>,
) -> AppResult<Json<DataResponse<TaRoster>>> {
    let stored = state
        .store
        .set_available_tas(&course, &edition, &input)
        .await?;
    Ok(Json(DataResponse { data: stored }))
}
