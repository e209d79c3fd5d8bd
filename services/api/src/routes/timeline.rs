//! Timeline endpoints

use axum::{
    Router,
    extract::State,
    middleware,
    routing::{delete, get, post},
};
use tracing::info;

use super::remove;
use crate::{
    error::ApiResult,
    extract::{FormPayload, ResourceId},
    middleware::auth_middleware,
    models::timeline::CreateTimeline,
    response::Envelope,
    state::AppState,
};

pub fn router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/add", post(add_timeline))
        .route("/delete/:id", delete(delete_timeline))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/getall", get(get_all_timelines))
        .merge(protected_routes)
}

pub async fn add_timeline(
    State(state): State<AppState>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let timeline = CreateTimeline::from_form(&form)?.into_timeline();
    state.timelines.insert(&timeline).await?;
    info!("Added timeline entry {}", timeline.id);

    Envelope::created()
        .message("Timeline added.")
        .with("timeline", &timeline)
}

pub async fn get_all_timelines(State(state): State<AppState>) -> ApiResult<Envelope> {
    let timelines = state.timelines.find_all().await?;
    Envelope::ok().with("timelines", &timelines)
}

pub async fn delete_timeline(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<Envelope> {
    remove(&state.timelines, id, "Timeline").await?;
    info!("Deleted timeline entry {}", id);

    Ok(Envelope::ok().message("Timeline deleted."))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_add_list_delete() {
        let app = TestApp::new();
        let token = app.seed_user().await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/v1/timeline/add",
                json!({
                    "title": "Graduated",
                    "description": "BSc Computer Science",
                    "from": "2016",
                    "to": "2019",
                }),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["timeline"]["timeline"], json!({ "from": "2016", "to": "2019" }));
        let id = body["timeline"]["_id"].as_str().unwrap().to_string();

        let (_, body) = app.get("/api/v1/timeline/getall").await;
        assert_eq!(body["timelines"][0]["_id"], id.as_str());

        let uri = format!("/api/v1/timeline/delete/{}", id);
        let (status, _) = app.delete(&uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.delete(&uri, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Timeline not found.");
    }
}
