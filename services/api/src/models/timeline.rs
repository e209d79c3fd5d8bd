//! Timeline entry model

use chrono::{DateTime, Utc};
use common::document::Document;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::FormPayload;
use crate::validation::FieldCheck;

/// Free-text period of a timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub from: String,
    pub to: String,
}

/// Timeline entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub timeline: Period,
    pub created_at: DateTime<Utc>,
}

impl Document for Timeline {
    const KIND: &'static str = "timeline";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Request for adding a timeline entry
pub struct CreateTimeline {
    pub title: String,
    pub description: String,
    pub period: Period,
}

impl CreateTimeline {
    pub fn from_form(form: &FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let title = check.required("title", "Title");
        let description = check.required("description", "Description");
        let from = check.required("from", "Timeline starting date");
        let to = check.required("to", "Timeline ending date");
        check.finish()?;

        Ok(Self {
            title,
            description,
            period: Period { from, to },
        })
    }

    pub fn into_timeline(self) -> Timeline {
        Timeline {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            timeline: self.period,
            created_at: Utc::now(),
        }
    }
}
