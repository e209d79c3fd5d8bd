//! Skill model

use chrono::{DateTime, Utc};
use common::document::Document;
use common::storage::StoredAsset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{FormPayload, UploadedFile};
use crate::validation::{FieldCheck, checked};

/// Highest accepted proficiency
pub const MAX_PROFICIENCY: u8 = 100;

/// Skill category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillCategory {
    #[serde(rename = "frontend")]
    Frontend,
    #[serde(rename = "backend")]
    Backend,
    #[serde(rename = "programming languages")]
    ProgrammingLanguages,
    #[serde(rename = "database")]
    Database,
    #[serde(rename = "others")]
    Others,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Frontend => "frontend",
            SkillCategory::Backend => "backend",
            SkillCategory::ProgrammingLanguages => "programming languages",
            SkillCategory::Database => "database",
            SkillCategory::Others => "others",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "frontend" => Ok(SkillCategory::Frontend),
            "backend" => Ok(SkillCategory::Backend),
            "programming languages" => Ok(SkillCategory::ProgrammingLanguages),
            "database" => Ok(SkillCategory::Database),
            "others" => Ok(SkillCategory::Others),
            other => Err(format!("Unknown skill category: {}", other)),
        }
    }
}

/// Skill entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub proficiency: u8,
    pub category: SkillCategory,
    pub svg: StoredAsset,
    pub created_at: DateTime<Utc>,
}

impl Document for Skill {
    const KIND: &'static str = "skill";

    fn id(&self) -> Uuid {
        self.id
    }
}

fn check_proficiency(check: &mut FieldCheck<'_>, proficiency: Option<u8>) -> Option<u8> {
    match proficiency {
        Some(value) if value > MAX_PROFICIENCY => {
            check.reject(format!(
                "Proficiency must be between 0 and {}.",
                MAX_PROFICIENCY
            ));
            None
        }
        other => other,
    }
}

/// Request for creating a skill
pub struct CreateSkill<'a> {
    pub title: String,
    pub proficiency: u8,
    pub category: SkillCategory,
    pub svg: &'a UploadedFile,
}

impl<'a> CreateSkill<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let title = check.required("title", "Title");
        let proficiency = check.required_parsed::<u8>("proficiency", "Proficiency");
        let proficiency = check_proficiency(&mut check, proficiency);
        let category = check.required_parsed::<SkillCategory>("category", "Category");
        let svg = check.required_file("svg", "Skill svg");
        check.finish()?;

        Ok(Self {
            title,
            proficiency: checked(proficiency, "Proficiency")?,
            category: checked(category, "Category")?,
            svg: checked(svg, "Skill svg")?,
        })
    }

    pub fn into_skill(self, svg: StoredAsset) -> Skill {
        Skill {
            id: Uuid::new_v4(),
            title: self.title,
            proficiency: self.proficiency,
            category: self.category,
            svg,
            created_at: Utc::now(),
        }
    }
}

/// Request for updating a skill
pub struct UpdateSkill<'a> {
    pub title: Option<String>,
    pub proficiency: Option<u8>,
    pub category: Option<SkillCategory>,
    pub svg: Option<&'a UploadedFile>,
}

impl<'a> UpdateSkill<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let title = check.optional("title");
        let proficiency = check.parsed::<u8>("proficiency", "Proficiency");
        let proficiency = check_proficiency(&mut check, proficiency);
        let category = check.parsed::<SkillCategory>("category", "Category");
        let svg = check.optional_file("svg");
        check.finish()?;

        Ok(Self {
            title,
            proficiency,
            category,
            svg,
        })
    }

    pub fn apply(&self, skill: &mut Skill) {
        if let Some(title) = &self.title {
            skill.title = title.clone();
        }
        if let Some(proficiency) = self.proficiency {
            skill.proficiency = proficiency;
        }
        if let Some(category) = self.category {
            skill.category = category;
        }
    }
}
