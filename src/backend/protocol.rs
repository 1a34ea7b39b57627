//! Response bodies of the backend's JSON endpoints.

use crate::foundation::error::{ArkError, ArkResult};

/// Key of the graceful-shutdown flag in the backend data store.
pub const SHUTDOWN_KEY: &str = "shutdown";
/// Sent in place of an image id when an upload fails.
pub const FAILED_UPLOAD_ID: &str = "-1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Success,
    Error,
    NotFound,
    Unknown,
}

impl JobStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Job in progress" => Self::InProgress,
            "Success" | "success" => Self::Success,
            "Job error" => Self::Error,
            "Not Found" => Self::NotFound,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in progress",
            Self::Success => "success",
            Self::Error => "error",
            Self::NotFound => "not found",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    /// Output image id, set only on success.
    pub image_id: Option<String>,
}

#[derive(serde::Deserialize)]
struct JobDoc {
    status: Option<String>,
    output_img: Option<String>,
    output_mask: Option<String>,
    detail: Option<String>,
}

/// `{"status": .., "output_img"|"output_mask": ..}` or `{"detail": ..}`.
pub fn parse_job_status(text: &str) -> ArkResult<JobStatusResponse> {
    let doc: JobDoc = serde_json::from_str(text)?;
    let Some(status) = doc.detail.as_deref().or(doc.status.as_deref()) else {
        return Err(ArkError::schema("job status has neither 'status' nor 'detail'"));
    };
    let status = JobStatus::parse(status);
    let image_id = match status {
        JobStatus::Success => doc.output_img.or(doc.output_mask),
        _ => None,
    };
    if status == JobStatus::Success && image_id.is_none() {
        return Err(ArkError::schema("successful job reported no output image"));
    }
    Ok(JobStatusResponse { status, image_id })
}

#[derive(serde::Deserialize)]
struct PluginListDoc {
    plugins: Vec<String>,
}

pub fn parse_plugin_list(text: &str) -> ArkResult<Vec<String>> {
    let doc: PluginListDoc = serde_json::from_str(text)?;
    Ok(doc.plugins)
}

#[derive(serde::Deserialize)]
struct UploadDoc {
    status: String,
    image_id: Option<String>,
}

pub fn parse_upload(text: &str) -> ArkResult<String> {
    let doc: UploadDoc = serde_json::from_str(text)?;
    match (doc.status.as_str(), doc.image_id) {
        ("Success", Some(id)) if !id.is_empty() => Ok(id),
        (status, _) => Err(ArkError::schema(format!(
            "upload rejected with status '{status}'"
        ))),
    }
}

#[derive(serde::Deserialize)]
struct JobIdDoc {
    job_id: String,
}

pub fn parse_job_id(text: &str) -> ArkResult<String> {
    let doc: JobIdDoc = serde_json::from_str(text)?;
    if doc.job_id.is_empty() {
        return Err(ArkError::schema("backend returned an empty job id"));
    }
    Ok(doc.job_id)
}

#[derive(serde::Deserialize)]
struct LoginDoc {
    logged_in: bool,
}

pub fn parse_login_status(text: &str) -> ArkResult<bool> {
    let doc: LoginDoc = serde_json::from_str(text)?;
    Ok(doc.logged_in)
}

#[derive(serde::Deserialize)]
struct UsernameDoc {
    username: String,
}

pub fn parse_username(text: &str) -> ArkResult<String> {
    let doc: UsernameDoc = serde_json::from_str(text)?;
    Ok(doc.username)
}

/// Level is an int; a bare bool (logged out) counts as level 0.
pub fn parse_subscription_level(text: &str) -> ArkResult<i32> {
    let doc: serde_json::Value = serde_json::from_str(text)?;
    match doc.get("subscription_level") {
        Some(serde_json::Value::Bool(_)) => Ok(0),
        Some(v) => v
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| ArkError::schema(format!("bad subscription level {v}"))),
        None => Err(ArkError::schema("response has no 'subscription_level'")),
    }
}

/// True only for a stored `{"shutdown": "true"}`.
pub fn parse_shutdown_flag(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|doc| doc.get(SHUTDOWN_KEY)?.as_str().map(|s| s == "true"))
        .unwrap_or(false)
}

pub fn shutdown_flag_json(graceful: bool) -> String {
    let mut doc = serde_json::Map::new();
    doc.insert(SHUTDOWN_KEY.to_string(), graceful.to_string().into());
    serde_json::Value::Object(doc).to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/backend/protocol.rs"]
mod tests;
