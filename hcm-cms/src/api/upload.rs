//! Multipart extraction
//!
//! Buffers a multipart body into text fields and uploaded files. The
//! coordinator only ever sees `UploadedFile` values.

use axum::extract::multipart::{Multipart, MultipartError};
use hcm_common::ids::{parse_id, parse_optional_id, EntityId};
use hcm_common::models::optional_text;
use std::collections::HashMap;

use crate::assets::UploadedFile;
use crate::error::ApiError;

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::BadRequest(e.body_text())
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    // Browsers send an empty part for a file input left blank
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.push(UploadedFile::new(name, file_name, bytes.to_vec()));
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Text with surrounding whitespace kept; missing reads as empty
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    /// Blank or missing reads as None
    pub fn optional_text(&self, name: &str) -> Option<String> {
        optional_text(self.text(name).map(str::to_string))
    }

    pub fn id(&self, name: &str) -> Result<EntityId, ApiError> {
        let raw = self
            .text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("{} is required", name)))?;
        Ok(parse_id(raw)?)
    }

    pub fn optional_id(&self, name: &str) -> Result<Option<EntityId>, ApiError> {
        Ok(parse_optional_id(self.text(name))?)
    }

    /// Ordering key; blank or missing is 0
    pub fn position(&self, name: &str) -> Result<i64, ApiError> {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("{} must be a number", name))),
        }
    }

    /// Checkbox semantics: present and not an explicit "off" value
    pub fn flag(&self, name: &str) -> bool {
        checkbox(self.text(name))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field_name == name)
    }
}

pub fn checkbox(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) => !matches!(v.as_str(), "" | "0" | "false" | "off"),
    }
}
