//! Scraped form field descriptors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::frame::FrameId;
use super::serde_util::null_as_default;

/// A form field as reported by the in-page scraper.
///
/// `index` is unique within one merged scrape; `local_index` is the position
/// the owning frame's collaborator uses to address the element when filling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(default)]
    pub index: usize,

    #[serde(default)]
    pub local_index: usize,

    #[serde(default)]
    pub frame_id: FrameId,

    /// Stable cache key for this field (see `jobfill_cache::fingerprint`).
    #[serde(default, alias = "fp", deserialize_with = "null_as_default")]
    pub fingerprint: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tag: String,

    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub field_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub options: Vec<String>,

    /// Semantic applicant-tracking-system category, e.g. `company` or `degree`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ats_field_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Raw DOM id. Never leaves the machine.
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub dom_id: Option<String>,

    /// Scraper attributes this engine does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDescriptor {
    pub fn is_file(&self) -> bool {
        self.field_type.trim().eq_ignore_ascii_case("file")
    }

    /// First non-empty of label, placeholder and name.
    pub fn display_label(&self) -> &str {
        [&self.label, &self.placeholder, &self.name]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    /// Copy suitable for sending to the remote mapping service.
    pub fn redacted(&self) -> FieldDescriptor {
        let mut copy = self.clone();
        copy.dom_id = None;
        copy.extra.remove("id");
        copy
    }

    pub fn ats_type(&self) -> Option<&str> {
        self.ats_field_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
