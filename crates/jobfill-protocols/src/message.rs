//! Messages exchanged with the in-page scrape/fill collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resume::ResumeData;
use crate::types::FieldDescriptor;

/// A message for one frame's collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameMessage {
    ScrapeFields(ScrapeRequest),
    FillWithValues(FillRequest),
}

impl FrameMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            FrameMessage::ScrapeFields(_) => "SCRAPE_FIELDS",
            FrameMessage::FillWithValues(_) => "FILL_WITH_VALUES",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub scope: String,
    pub expand_select_options: bool,
    /// Click "Add another" on employment blocks before scraping.
    pub pre_expand_employment: bool,
    pub pre_expand_education: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_education_blocks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_employment_blocks: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    /// Local field index (stringified) to value.
    pub values: BTreeMap<String, String>,
    pub fields_for_frame: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_data: Option<ResumeData>,
    pub scope: String,
    pub last_fill: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub filled_count: usize,
    #[serde(default)]
    pub resume_upload_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
