//! Skill endpoints

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
    models::skill::{CreateSkill, UpdateSkill},
    response::Envelope,
    state::AppState,
};

const KIND: &str = "Skill";

pub fn router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/add", post(add_skill))
        .route("/update/:id", put(update_skill))
        .route("/delete/:id", delete(delete_skill))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/getall", get(get_all_skills))
        .merge(protected_routes)
}

pub async fn add_skill(State(state): State<AppState>, form: FormPayload) -> ApiResult<Envelope> {
    let request = CreateSkill::from_form(&form)?;

    let mut assets = AssetBatch::new(state.storage.as_ref());
    let svg = assets.upload(request.svg, folders::SKILL_ICONS).await?;
    let skill = request.into_skill(svg);
    assets
        .commit(state.skills.insert(&skill).await.map_err(ApiError::from))
        .await?;
    info!("Added skill {} ({})", skill.title, skill.id);

    Envelope::created()
        .message("New skill added.")
        .with("skill", &skill)
}

pub async fn get_all_skills(State(state): State<AppState>) -> ApiResult<Envelope> {
    let skills = state.skills.find_all().await?;
    Envelope::ok().with("skills", &skills)
}

pub async fn update_skill(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let request = UpdateSkill::from_form(&form)?;
    let mut skill = load(&state.skills, id, KIND).await?;
    request.apply(&mut skill);

    let mut assets = AssetBatch::new(state.storage.as_ref());
    assets
        .replace(&mut skill.svg, request.svg, folders::SKILL_ICONS)
        .await?;
    assets.commit(save(&state.skills, &skill, KIND).await).await?;
    info!("Updated skill {}", skill.id);

    Envelope::ok().message("Skill updated.").with("skill", &skill)
}

pub async fn delete_skill(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<Envelope> {
    let skill = load(&state.skills, id, KIND).await?;
    assets::release_then_remove(
        state.storage.as_ref(),
        &skill.svg,
        remove(&state.skills, id, KIND),
    )
    .await?;
    info!("Deleted skill {}", id);

    Ok(Envelope::ok().message("Skill deleted."))
}
