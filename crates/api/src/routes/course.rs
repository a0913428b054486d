//! Route definitions for the `/courses` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::course;
use crate::state::AppState;

/// Routes mounted at `/courses`.
///
/// ```text
/// GET    /                                             -> list_courses
/// POST   /                                             -> import_course
/// POST   /{course}/editions                            -> add_edition
/// GET    /{course}/editions/{edition}                  -> get_edition
/// POST   /{course}/editions/{edition}/transactions     -> save_transactions
/// POST   /{course}/editions/{edition}/provision        -> provision
/// GET    /{course}/editions/{edition}/project-settings -> get_project_settings
/// PUT    /{course}/editions/{edition}/project-settings -> put_project_settings
/// GET    /{course}/editions/{edition}/tas              -> get_available_tas
/// PUT    /{course}/editions/{edition}/tas              -> put_available_tas
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(course::list_courses).post(course::import_course))
        .route("/{course}/editions", post(course::add_edition))
        .route("/{course}/editions/{edition}", get(course::get_edition))
        .route(
            "/{course}/editions/{edition}/transactions",
            post(course::save_transactions),
        )
        .route("/{course}/editions/{edition}/provision", post(course::provision))
        .route(
            "/{course}/editions/{edition}/project-settings",
            get(course::get_project_settings).put(course::put_project_settings),
        )
        .route(
            "/{course}/editions/{edition}/tas",
            get(course::get_available_tas).put(course::put_available_tas),
        )
}
