//! Documents stored by the API and the requests that create or change them

pub mod experience;
pub mod message;
pub mod project;
pub mod skill;
pub mod software_application;
pub mod timeline;
pub mod user;
