//! Project endpoints

use axum::{
    Router,
    extract::State,
    middleware,
    routing::{delete, get, post, put},
};
use tracing::info;

use super::{load, remove, save};
use crate::{
    assets::{self, AssetBatch, folders},
    error::{ApiError, ApiResult},
    extract::{FormPayload, ResourceId},
    middleware::auth_middleware,
    models::project::{CreateProject, UpdateProject},
    response::Envelope,
    state::AppState,
};

const KIND: &str = "Project";

pub fn router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/add", post(add_project))
        .route("/update/:id", put(update_project))
        .route("/delete/:id", delete(delete_project))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/getall", get(get_all_projects))
        .route("/get/:id", get(get_project))
        .merge(protected_routes)
}

/// Add a project with its banner
pub async fn add_project(
    State(state): State<AppState>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = CreateProject::from_form(&form)?;

    let mut assets = AssetBatch::new(state.storage.as_ref());
    let banner = assets.upload(request.banner, folders::PROJECT_BANNERS).await?;
    let project = request.into_project(banner);
    assets
        .commit(state.projects.insert(&project).await.map_err(ApiError::from))
        .await?;
    info!("Added project {}", project.id);

    Envelope::created()
        .message("New project added.")
        .with("project", &project)
}

/// List every project
pub async fn get_all_projects(State(state): State<AppState>) -> ApiResult<Envelope> {
    let projects = state.projects.find_all().await?;
    Envelope::ok().with("projects", &projects)
}

/// Get one project
pub async fn get_project(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<Envelope> {
    let project = load(&state.projects, id, KIND).await?;
    Envelope::ok().with("project", &project)
}

/// Update a project, replacing the banner when a new one is sent
pub async fn update_project(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = UpdateProject::from_form(&form)?;
    let mut project = load(&state.projects, id, KIND).await?;
    request.apply(&mut project);

    let mut assets = AssetBatch::new(state.storage.as_ref());
    assets
        .replace(&mut project.project_banner, request.banner, folders::PROJECT_BANNERS)
        .await?;
    assets
        .commit(save(&state.projects, &project, KIND).await)
        .await?;
    info!("Updated project {}", project.id);

    Envelope::ok()
        .message("Project updated.")
        .with("project", &project)
}

/// Delete a project and its banner
pub async fn delete_project(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<Envelope> {
    let project = load(&state.projects, id, KIND).await?;
    assets::release_then_remove(
        state.storage.as_ref(),
        &project.project_banner,
        remove(&state.projects, id, KIND),
    )
    .await?;
    info!("Deleted project {}", id);

    Ok(Envelope::ok().message("Project deleted."))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{MultipartForm, TestApp};
    use axum::http::{Method, StatusCode};

    fn project_form() -> MultipartForm {
        MultipartForm::new()
            .text("title", "Portfolio")
            .text("description", "Content management for my site")
            .text("gitRepoLink", "https://github.com/ada/portfolio")
            .text("projectLink", "https://ada.dev")
            .text("technologies", "Rust, Axum")
            .text("stack", "Full Stack")
            .text("deployed", "Yes")
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let app = TestApp::new();
        let token = app.seed_user().await;

        let (status, body) = app
            .multipart(
                Method::POST,
                "/api/v1/project/add",
                project_form().file("projectBanner", "banner.png", b"png"),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["project"]["technologies"], serde_json::json!(["Rust", "Axum"]));
        let id = body["project"]["_id"].as_str().unwrap().to_string();
        let banner = body["project"]["projectBanner"]["storageId"].as_str().unwrap();
        assert!(app.storage.contains(banner));

        let (status, body) = app.get(&format!("/api/v1/project/get/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["title"], "Portfolio");

        let (_, body) = app.get("/api/v1/project/getall").await;
        assert_eq!(body["projects"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_without_banner_persists_nothing() {
        let app = TestApp::new();
        let token = app.seed_user().await;

        let (status, body) = app
            .multipart(Method::POST, "/api/v1/project/add", project_form(), Some(&token))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Project banner is required.");
        assert_eq!(app.count("project").await, 0);
        assert_eq!(app.storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_persists_nothing() {
        let app = TestApp::new();
        let token = app.seed_user().await;
        app.storage.fail_uploads(true);

        let (status, body) = app
            .multipart(
                Method::POST,
                "/api/v1/project/add",
                project_form().file("projectBanner", "banner.png", b"png"),
                Some(&token),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
        assert_eq!(app.count("project").await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_banner() {
        let app = TestApp::new();
        let token = app.seed_user().await;
        let (_, body) = app
            .multipart(
                Method::POST,
                "/api/v1/project/add",
                project_form().file("projectBanner", "old.png", b"old"),
                Some(&token),
            )
            .await;
        let id = body["project"]["_id"].as_str().unwrap().to_string();
        let old = body["project"]["projectBanner"]["storageId"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, body) = app
            .multipart(
                Method::PUT,
                &format!("/api/v1/project/update/{}", id),
                MultipartForm::new()
                    .text("deployed", "No")
                    .file("projectBanner", "new.png", b"new"),
                Some(&token),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let new = body["project"]["projectBanner"]["storageId"].as_str().unwrap();
        assert_ne!(new, old);
        assert_eq!(body["project"]["deployed"], "No");
        assert_eq!(body["project"]["title"], "Portfolio");
        assert!(app.storage.contains(new));
        assert!(!app.storage.contains(&old));
        assert_eq!(app.storage.delete_count(&old), 1);
        assert_eq!(app.storage.object_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_and_unknown_ids() {
        let app = TestApp::new();

        let (status, body) = app.get("/api/v1/project/get/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid id: not-a-uuid");

        let (status, body) = app
            .get(&format!("/api/v1/project/get/{}", uuid::Uuid::new_v4()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Project not found.");
    }

    #[tokio::test]
    async fn test_writes_require_authentication() {
        let app = TestApp::new();

        let (status, body) = app
            .multipart(
                Method::POST,
                "/api/v1/project/add",
                project_form().file("projectBanner", "banner.png", b"png"),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "User not authenticated.");
        assert_eq!(app.storage.object_count(), 0);
    }
}
