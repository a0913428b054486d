pub mod course;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /courses                                                 list, import
/// /courses/{course}/editions                               add edition
/// /courses/{course}/editions/{edition}                     get
/// /courses/{course}/editions/{edition}/transactions        replay log (POST)
/// /courses/{course}/editions/{edition}/provision           provision on GitLab (POST)
/// /courses/{course}/editions/{edition}/project-settings    get, put
/// /courses/{course}/editions/{edition}/tas                 get, put
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/courses", course::router())
}
