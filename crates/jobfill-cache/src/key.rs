//! Request signature for the session tier.

use serde::Serialize;
use sha2::{Digest, Sha256};

use jobfill_protocols::{AutofillContext, FieldDescriptor, FrameId};

/// What the session key captures of each field.
#[derive(Serialize)]
struct FieldSummary<'a> {
    fingerprint: &'a str,
    frame_id: FrameId,
    local_index: usize,
    label: &'a str,
    #[serde(rename = "type")]
    field_type: &'a str,
    options: &'a [String],
    ats_field_type: Option<&'a str>,
}

#[derive(Serialize)]
struct Signature<'a> {
    fields: Vec<FieldSummary<'a>>,
    profile: &'a serde_json::Map<String, serde_json::Value>,
    custom_answers: &'a std::collections::BTreeMap<String, String>,
    resume_text: &'a str,
}

/// Key of a whole mapping request: field summaries, profile, answers and
/// résumé text serialized together and hashed.
pub fn session_key(fields: &[FieldDescriptor], context: &AutofillContext) -> String {
    let signature = Signature {
        fields: fields
            .iter()
            .map(|f| FieldSummary {
                fingerprint: &f.fingerprint,
                frame_id: f.frame_id,
                local_index: f.local_index,
                label: f.display_label(),
                field_type: &f.field_type,
                options: &f.options,
                ats_field_type: f.ats_type(),
            })
            .collect(),
        profile: &context.profile,
        custom_answers: &context.custom_answers,
        resume_text: &context.resume_text,
    };
    let payload = serde_json::to_vec(&signature).unwrap_or_default();
    hex::encode(Sha256::digest(&payload))
}
