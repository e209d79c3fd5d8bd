//! Contact message model

use chrono::{DateTime, Utc};
use common::document::Document;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::FormPayload;
use crate::validation::FieldCheck;

/// Message left through the public contact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub sender_name: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Document for Message {
    const KIND: &'static str = "message";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Request for sending a message
pub struct SendMessage {
    pub sender_name: String,
    pub subject: String,
    pub message: String,
}

impl SendMessage {
    pub fn from_form(form: &FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let sender_name = check.required("senderName", "Name");
        let subject = check.required("subject", "Subject");
        let message = check.required("message", "Message");
        check.finish()?;

        Ok(Self {
            sender_name,
            subject,
            message,
        })
    }

    pub fn into_message(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_name: self.sender_name,
            subject: self.subject,
            message: self.message,
            created_at: Utc::now(),
        }
    }
}
