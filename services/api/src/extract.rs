//! Request extractors
//!
//! Write endpoints accept JSON, urlencoded or multipart bodies. All three
//! are decoded into a [`FormPayload`] so that validation reads fields the
//! same way regardless of how the client sent them. Decoding failures are
//! raised as [`ApiError`]s.

use axum::{
    Form, Json,
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::{header::CONTENT_TYPE, request::Parts},
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path as FsPath;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// A file received in a multipart body, spooled to a temporary file
///
/// The temporary file is removed when the value is dropped.
#[derive(Debug)]
pub struct UploadedFile {
    /// Name given by the client
    pub file_name: String,
    /// Declared content type
    pub content_type: Option<String>,
    temp: NamedTempFile,
}

impl UploadedFile {
    /// Spool received bytes to a temporary file keeping the client's extension
    pub fn spool(file_name: &str, content_type: Option<String>, bytes: &[u8]) -> ApiResult<Self> {
        let suffix = FsPath::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let mut temp = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| anyhow::anyhow!("Failed to create temporary file: {}", e))?;
        temp.write_all(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to write temporary file: {}", e))?;

        Ok(Self {
            file_name: file_name.to_string(),
            content_type,
            temp,
        })
    }

    /// Location of the spooled content
    pub fn path(&self) -> &FsPath {
        self.temp.path()
    }
}

/// Decoded body of a write request
#[derive(Debug, Default)]
pub struct FormPayload {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormPayload {
    /// Add a text value; repeated names accumulate
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Add a file; repeated names accumulate
    pub fn push_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.entry(name.into()).or_default().push(file);
    }

    /// First non-blank value of a field, trimmed
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)?
            .iter()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    /// A list field, accepted as repeated values, a JSON array or a
    /// comma-separated string
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        let values = self.fields.get(name)?;
        Some(
            values
                .iter()
                .flat_map(|value| value.split(','))
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// The single file sent under `name`
    pub fn file(&self, name: &str) -> ApiResult<Option<&UploadedFile>> {
        match self.files.get(name).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([file]) => Ok(Some(file)),
            Some(_) => Err(ApiError::validation(format!(
                "Only one file may be uploaded as {}.",
                name
            ))),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut payload = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::validation(e.body_text()))?;
                    // Browsers send an empty part for an untouched file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    let file = UploadedFile::spool(&file_name, content_type, &bytes)?;
                    payload.push_file(name, file);
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::validation(e.body_text()))?;
                    payload.push_field(name, value);
                }
            }
        }

        Ok(payload)
    }

    fn from_json(value: Value) -> ApiResult<Self> {
        let Value::Object(object) = value else {
            return Err(ApiError::validation("Request body must be a JSON object."));
        };

        let mut payload = Self::default();
        for (name, value) in object {
            match value {
                Value::Null | Value::Object(_) => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(text) = scalar_text(item) {
                            payload.push_field(name.clone(), text);
                        }
                    }
                }
                scalar => {
                    if let Some(text) = scalar_text(scalar) {
                        payload.push_field(name, text);
                    }
                }
            }
        }
        Ok(payload)
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            Self::from_json(value)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            let mut payload = Self::default();
            for (name, value) in pairs {
                payload.push_field(name, value);
            }
            Ok(payload)
        } else {
            // No body: required-field validation reports what is missing
            Ok(Self::default())
        }
    }
}

/// Document identifier taken from the `:id` path segment
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;

        Uuid::parse_str(&raw)
            .map(ResourceId)
            .map_err(|_| ApiError::InvalidId {
                path: "id",
                value: raw,
            })
    }
}
