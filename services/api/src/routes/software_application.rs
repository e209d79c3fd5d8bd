//! Software application endpoints

use axum::{
    Router,
    extract::State,
    middleware,
    routing::{delete, get, post},
};
use tracing::info;

use super::{load, remove};
use crate::{
    assets::{self, AssetBatch, folders},
    error::{ApiError, ApiResult},
    extract::{FormPayload, ResourceId},
    middleware::auth_middleware,
    models::software_application::CreateSoftwareApplication,
    response::Envelope,
    state::AppState,
};

const KIND: &str = "Software application";

pub fn router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/add", post(add_application))
        .route("/delete/:id", delete(delete_application))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/getall", get(get_all_applications))
        .merge(protected_routes)
}

pub async fn add_application(
    State(state): State<AppState>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = CreateSoftwareApplication::from_form(&form)?;

    let mut assets = AssetBatch::new(state.storage.as_ref());
    let svg = assets
        .upload(request.svg, folders::SOFTWARE_APPLICATION_ICONS)
        .await?;
    let application = request.into_application(svg);
    assets
        .commit(
            state
                .software_applications
                .insert(&application)
                .await
                .map_err(ApiError::from),
        )
        .await?;
    info!("Added software application {}", application.id);

    Envelope::created()
        .message("New software application added.")
        .with("softwareApplication", &application)
}

pub async fn get_all_applications(State(state): State<AppState>) -> ApiResult<Envelope> {
    let applications = state.software_applications.find_all().await?;
    Envelope::ok().with("softwareApplications", &applications)
}

pub async fn delete_application(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<Envelope> {
    let application = load(&state.software_applications, id, KIND).await?;
    assets::release_then_remove(
        state.storage.as_ref(),
        &application.svg,
        remove(&state.software_applications, id, KIND),
    )
    .await?;
    info!("Deleted software application {}", id);

    Ok(Envelope::ok().message("Software application deleted."))
}
