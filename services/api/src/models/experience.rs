//! Work experience model

use chrono::{DateTime, Utc};
use common::document::Document;
use common::storage::StoredAsset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{FormPayload, UploadedFile};
use crate::validation::{FieldCheck, checked};

/// Experience entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub role: String,
    pub company: String,
    /// Free text, e.g. "2021 - 2024"
    pub date: String,
    pub desc: String,
    pub skills: Vec<String>,
    pub experience_banner: StoredAsset,
    pub created_at: DateTime<Utc>,
}

impl Document for Experience {
    const KIND: &'static str = "experience";

    fn id(&self) -> Uuid {
        self.id
    }

    /// Most recent first, comparing the free-text dates as strings
    fn sort(documents: &mut [Self]) {
        documents.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

/// Request for adding an experience
pub struct CreateExperience<'a> {
    pub role: String,
    pub company: String,
    pub date: String,
    pub desc: String,
    pub skills: Vec<String>,
    pub banner: &'a UploadedFile,
}

impl<'a> CreateExperience<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let role = check.required("role", "Role");
        let company = check.required("company", "Company");
        let date = check.required("date", "Date");
        let desc = check.required("desc", "Description");
        let skills = check.required_list("skills", "Skills");
        let banner = check.required_file("experienceBanner", "Experience banner");
        check.finish()?;

        Ok(Self {
            role,
            company,
            date,
            desc,
            skills,
            banner: checked(banner, "Experience banner")?,
        })
    }

    pub fn into_experience(self, experience_banner: StoredAsset) -> Experience {
        Experience {
            id: Uuid::new_v4(),
            role: self.role,
            company: self.company,
            date: self.date,
            desc: self.desc,
            skills: self.skills,
            experience_banner,
            created_at: Utc::now(),
        }
    }
}

/// Request for updating an experience
pub struct UpdateExperience<'a> {
    pub role: Option<String>,
    pub company: Option<String>,
    pub date: Option<String>,
    pub desc: Option<String>,
    pub skills: Option<Vec<String>>,
    pub banner: Option<&'a UploadedFile>,
}

impl<'a> UpdateExperience<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let skills = check.optional_list("skills", "Skills");
        let banner = check.optional_file("experienceBanner");
        let update = Self {
            role: check.optional("role"),
            company: check.optional("company"),
            date: check.optional("date"),
            desc: check.optional("desc"),
            skills,
            banner,
        };
        check.finish()?;
        Ok(update)
    }

    pub fn apply(&self, experience: &mut Experience) {
        if let Some(role) = &self.role {
            experience.role = role.clone();
        }
        if let Some(company) = &self.company {
            experience.company = company.clone();
        }
        if let Some(date) = &self.date {
            experience.date = date.clone();
        }
        if let Some(desc) = &self.desc {
            experience.desc = desc.clone();
        }
        if let Some(skills) = &self.skills {
            experience.skills = skills.clone();
        }
    }
}
