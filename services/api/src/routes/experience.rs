//! Work experience endpoints

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
    models::experience::{CreateExperience, UpdateExperience},
    response::Envelope,
    state::AppState,
};

const KIND: &str = "Experience";

pub fn router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/add", post(add_experience))
        .route("/update/:id", put(update_experience))
        .route("/delete/:id", delete(delete_experience))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/getall", get(get_all_experiences))
        .merge(protected_routes)
}

pub async fn add_experience(
    State(state): State<AppState>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = CreateExperience::from_form(&form)?;

    let mut assets = AssetBatch::new(state.storage.as_ref());
    let banner = assets
        .upload(request.banner, folders::EXPERIENCE_BANNERS)
        .await?;
    let experience = request.into_experience(banner);
    assets
        .commit(
            state
                .experiences
                .insert(&experience)
                .await
                .map_err(ApiError::from),
        )
        .await?;
    info!("Added experience {} at {}", experience.id, experience.company);

    Envelope::created()
        .message("New experience added.")
        .with("experience", &experience)
}

/// List experiences, most recent first
pub async fn get_all_experiences(State(state): State<AppState>) -> ApiResult<Envelope> {
    let experiences = state.experiences.find_all().await?;
    Envelope::ok().with("experiences", &experiences)
}

pub async fn update_experience(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = UpdateExperience::from_form(&form)?;
    let mut experience = load(&state.experiences, id, KIND).await?;
    request.apply(&mut experience);

    let mut assets = AssetBatch::new(state.storage.as_ref());
    assets
        .replace(
            &mut experience.experience_banner,
            request.banner,
            folders::EXPERIENCE_BANNERS,
        )
        .await?;
    assets
        .commit(save(&state.experiences, &experience, KIND).await)
        .await?;
    info!("Updated experience {}", experience.id);

    Envelope::ok()
        .message("Experience updated.")
        .with("experience", &experience)
}

pub async fn delete_experience(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<Envelope> {
    let experience = load(&state.experiences, id, KIND).await?;
    assets::release_then_remove(
        state.storage.as_ref(),
        &experience.experience_banner,
        remove(&state.experiences, id, KIND),
    )
    .await?;
    info!("Deleted experience {}", id);

    Ok(Envelope::ok().message("Experience deleted."))
}
