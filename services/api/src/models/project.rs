//! Portfolio project model

use chrono::{DateTime, Utc};
use common::document::Document;
use common::storage::StoredAsset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{FormPayload, UploadedFile};
use crate::validation::{FieldCheck, checked};

/// Project entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub git_repo_link: String,
    pub project_link: String,
    pub technologies: Vec<String>,
    pub stack: String,
    pub deployed: String,
    pub project_banner: StoredAsset,
    pub created_at: DateTime<Utc>,
}

impl Document for Project {
    const KIND: &'static str = "project";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Request for creating a project
pub struct CreateProject<'a> {
    pub title: String,
    pub description: String,
    pub git_repo_link: String,
    pub project_link: String,
    pub technologies: Vec<String>,
    pub stack: String,
    pub deployed: String,
    pub banner: &'a UploadedFile,
}

impl<'a> CreateProject<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let title = check.required("title", "Title");
        let description = check.required("description", "Description");
        let git_repo_link = check.required("gitRepoLink", "Repository link");
        let project_link = check.required("projectLink", "Project link");
        let technologies = check.required_list("technologies", "Technologies");
        let stack = check.required("stack", "Stack");
        let deployed = check.required("deployed", "Deployed");
        let banner = check.required_file("projectBanner", "Project banner");
        check.finish()?;

        Ok(Self {
            title,
            description,
            git_repo_link,
            project_link,
            technologies,
            stack,
            deployed,
            banner: checked(banner, "Project banner")?,
        })
    }

    pub fn into_project(self, project_banner: StoredAsset) -> Project {
        Project {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            git_repo_link: self.git_repo_link,
            project_link: self.project_link,
            technologies: self.technologies,
            stack: self.stack,
            deployed: self.deployed,
            project_banner,
            created_at: Utc::now(),
        }
    }
}

/// Request for updating a project
pub struct UpdateProject<'a> {
    pub title: Option<String>,
    pub description: Option<String>,
    pub git_repo_link: Option<String>,
    pub project_link: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub stack: Option<String>,
    pub deployed: Option<String>,
    pub banner: Option<&'a UploadedFile>,
}

impl<'a> UpdateProject<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let technologies = check.optional_list("technologies", "Technologies");
        let banner = check.optional_file("projectBanner");
        let update = Self {
            title: check.optional("title"),
            description: check.optional("description"),
            git_repo_link: check.optional("gitRepoLink"),
            project_link: check.optional("projectLink"),
            technologies,
            stack: check.optional("stack"),
            deployed: check.optional("deployed"),
            banner,
        };
        check.finish()?;
        Ok(update)
    }

    /// Apply the scalar changes; the banner is handled by the caller
    pub fn apply(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(link) = &self.git_repo_link {
            project.git_repo_link = link.clone();
        }
        if let Some(link) = &self.project_link {
            project.project_link = link.clone();
        }
        if let Some(technologies) = &self.technologies {
            project.technologies = technologies.clone();
        }
        if let Some(stack) = &self.stack {
            project.stack = stack.clone();
        }
        if let Some(deployed) = &self.deployed {
            project.deployed = deployed.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_every_field_and_banner() {
        let mut form = FormPayload::default();
        form.push_field("title", "Portfolio");
        form.push_field("technologies", "Rust, Axum");

        let err = CreateProject::from_form(&form).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Description is required. Repository link is required. Project link is required. \
             Stack is required. Deployed is required. Project banner is required."
        );
    }

    #[test]
    fn test_update_normalizes_technologies() {
        let mut form = FormPayload::default();
        form.push_field("technologies", "Rust,Axum , Postgres");

        let update = UpdateProject::from_form(&form).unwrap();
        let mut project = Project {
            id: Uuid::new_v4(),
            title: "Portfolio".to_string(),
            description: "CMS".to_string(),
            git_repo_link: "https://github.com/ada/portfolio".to_string(),
            project_link: "https://ada.dev".to_string(),
            technologies: vec!["Node".to_string()],
            stack: "Full stack".to_string(),
            deployed: "Yes".to_string(),
            project_banner: StoredAsset {
                storage_id: "project-banners/a.png".to_string(),
                url: "https://cdn.test/project-banners/a.png".to_string(),
            },
            created_at: Utc::now(),
        };
        update.apply(&mut project);

        assert_eq!(project.technologies, vec!["Rust", "Axum", "Postgres"]);
        assert_eq!(project.title, "Portfolio");
        assert!(update.banner.is_none());
    }
}
