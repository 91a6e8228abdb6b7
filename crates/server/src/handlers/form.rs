//! Multipart submission form shared by the content store and the gateway.

use crate::error::{ApiError, ApiResult};
use axum::extract::Multipart;
use bytes::Bytes;
use sleuth_client::Upload;
use sleuth_core::wire::require_non_empty;

/// A parsed `student_id` / `assignment_id` / `file` form.
#[derive(Debug)]
pub struct SubmissionForm {
    pub student_id: String,
    pub assignment_id: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl SubmissionForm {
    /// Read the form, rejecting missing or empty identity fields and a
    /// missing file part. Unknown parts are skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut student_id = None;
        let mut assignment_id = None;
        let mut file = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(ApiError::from_multipart)?
        {
            match field.name() {
                Some("student_id") => {
                    student_id = Some(field.text().await.map_err(ApiError::from_multipart)?);
                }
                Some("assignment_id") => {
                    assignment_id = Some(field.text().await.map_err(ApiError::from_multipart)?);
                }
                Some("file") => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(ApiError::from_multipart)?;
                    file = Some((file_name, content_type, data));
                }
                other => {
                    tracing::debug!(field = ?other, "ignoring unknown form field");
                }
            }
        }

        let student_id = student_id.ok_or_else(|| missing("student_id"))?;
        let assignment_id = assignment_id.ok_or_else(|| missing("assignment_id"))?;
        let (file_name, content_type, data) = file.ok_or_else(|| missing("file"))?;
        require_non_empty("student_id", &student_id)?;
        require_non_empty("assignment_id", &assignment_id)?;

        Ok(Self {
            student_id,
            assignment_id,
            file_name,
            content_type,
            data,
        })
    }

    pub fn into_upload(self) -> Upload {
        Upload {
            student_id: self.student_id,
            assignment_id: self.assignment_id,
            file_name: self.file_name,
            content_type: self.content_type,
            data: self.data,
        }
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::BadRequest(format!("missing form field '{field}'"))
}
