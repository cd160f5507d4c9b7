//! Mapping results returned by the remote mapping service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::field::FieldDescriptor;
use super::serde_util::{null_as_default, scalar_as_string};

/// The value chosen for one field. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    /// `None` means the service found no derivable value.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub value: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not", deserialize_with = "null_as_default")]
    pub unfillable: bool,
}

impl MappingResult {
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            confidence: 1.0,
            ..Default::default()
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// The value if it is worth writing into a page: present and not blank.
    pub fn fill_value(&self) -> Option<&str> {
        if self.unfillable {
            return None;
        }
        self.value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

/// Response of `POST /form-fields/map`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub mappings: HashMap<String, MappingResult>,

    /// Profile attributes the service needed but the user has not filled in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfilled_profile_keys: Option<Vec<String>>,
}

impl MappingResponse {
    /// Look a field up by fingerprint, then by global index, then by local index.
    pub fn lookup(&self, field: &FieldDescriptor) -> Option<&MappingResult> {
        if !field.fingerprint.is_empty() {
            if let Some(found) = self.mappings.get(&field.fingerprint) {
                return Some(found);
            }
        }
        self.mappings
            .get(&field.index.to_string())
            .or_else(|| self.mappings.get(&field.local_index.to_string()))
    }
}
