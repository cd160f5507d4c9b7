//! The user's autofill context: profile, saved answers and résumé reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::serde_util::{null_as_default, string_map};

/// Everything the mapping service needs to know about the user.
///
/// Replaced wholesale on refresh, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutofillContext {
    #[serde(default, deserialize_with = "null_as_default")]
    pub profile: Map<String, Value>,

    #[serde(default, deserialize_with = "string_map")]
    pub custom_answers: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub resume_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}

impl AutofillContext {
    /// An empty context cannot drive a fill.
    pub fn is_empty(&self) -> bool {
        self.profile.is_empty() && self.custom_answers.is_empty()
    }

    /// Holds both a profile and saved answers.
    pub fn is_complete(&self) -> bool {
        !self.profile.is_empty() && !self.custom_answers.is_empty()
    }

    /// Number of employment entries in the profile.
    pub fn experience_count(&self) -> usize {
        self.profile_list_len("experiences")
    }

    /// Number of education entries in the profile.
    pub fn education_count(&self) -> usize {
        self.profile_list_len("educations")
    }

    fn profile_list_len(&self, key: &str) -> usize {
        self.profile
            .get(key)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}
