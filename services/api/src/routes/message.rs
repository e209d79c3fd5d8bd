//! Contact message endpoints
//!
//! Sending is public; reading and deleting are for the site owner.

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
    models::message::SendMessage,
    response::Envelope,
    state::AppState,
};

pub fn router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/getall", get(get_all_messages))
        .route("/delete/:id", delete(delete_message))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/send", post(send_message))
        .merge(protected_routes)
}

pub async fn send_message(
    State(state): State<AppState>,
    form: FormPayload,
) -> ApiResult<Envelope> {
    let message = SendMessage::from_form(&form)?.into_message();
    state.messages.insert(&message).await?;
    info!("Received message {} from {}", message.id, message.sender_name);

    // `message` is taken by the envelope text
    Envelope::created()
        .message("Message sent.")
        .with("data", &message)
}

pub async fn get_all_messages(State(state): State<AppState>) -> ApiResult<Envelope> {
    let messages = state.messages.find_all().await?;
    Envelope::ok().with("messages", &messages)
}

pub async fn delete_message(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult<Envelope> {
    remove(&state.messages, id, "Message").await?;
    info!("Deleted message {}", id);

    Ok(Envelope::ok().message("Message deleted."))
}
