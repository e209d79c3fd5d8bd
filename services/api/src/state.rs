//! Application state shared across handlers

use common::document::{Collection, DocumentStore};
use common::storage::ObjectStorage;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::jwt::JwtService;
use crate::mailer::Mailer;
use crate::models::{
    experience::Experience, message::Message, project::Project, skill::Skill,
    software_application::SoftwareApplication, timeline::Timeline, user::User,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt_service: JwtService,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<ServerConfig>,
    pub users: Collection<User>,
    pub projects: Collection<Project>,
    pub skills: Collection<Skill>,
    pub software_applications: Collection<SoftwareApplication>,
    pub timelines: Collection<Timeline>,
    pub messages: Collection<Message>,
    pub experiences: Collection<Experience>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        jwt_service: JwtService,
        mailer: Arc<dyn Mailer>,
        config: ServerConfig,
    ) -> Self {
        Self {
            users: Collection::new(store.clone()),
            projects: Collection::new(store.clone()),
            skills: Collection::new(store.clone()),
            software_applications: Collection::new(store.clone()),
            timelines: Collection::new(store.clone()),
            messages: Collection::new(store.clone()),
            experiences: Collection::new(store.clone()),
            store,
            storage,
            jwt_service,
            mailer,
            config: Arc::new(config),
        }
    }
}
