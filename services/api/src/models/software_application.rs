//! Software application icon model

use chrono::{DateTime, Utc};
use common::document::Document;
use common::storage::StoredAsset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{FormPayload, UploadedFile};
use crate::validation::{FieldCheck, checked};

/// Software application entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareApplication {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub svg: StoredAsset,
    pub created_at: DateTime<Utc>,
}

impl Document for SoftwareApplication {
    const KIND: &'static str = "software_application";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Request for adding a software application
pub struct CreateSoftwareApplication<'a> {
    pub name: String,
    pub svg: &'a UploadedFile,
}

impl<'a> CreateSoftwareApplication<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let name = check.required("name", "Name");
        let svg = check.required_file("svg", "Software application icon");
        check.finish()?;

        Ok(Self {
            name,
            svg: checked(svg, "Software application icon")?,
        })
    }

    pub fn into_application(self, svg: StoredAsset) -> SoftwareApplication {
        SoftwareApplication {
            id: Uuid::new_v4(),
            name: self.name,
            svg,
            created_at: Utc::now(),
        }
    }
}
