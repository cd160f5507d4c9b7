//! Turning merged mappings into per-frame fill requests.

use std::collections::{BTreeMap, HashMap, HashSet};

use jobfill_cache::Mappings;
use jobfill_protocols::{AutofillContext, FieldDescriptor, FillRequest, FrameId, ResumeData};

use crate::selectors::SelectorHints;

/// Value telling the page collaborator to attach the stored résumé.
pub const RESUME_SENTINEL: &str = "__RESUME__";

const EDUCATION_TYPES: &[&str] = &[
    "school",
    "institution",
    "degree",
    "major",
    "field_of_study",
    "gpa",
    "education_start",
    "education_end",
];

const EMPLOYMENT_TYPES: &[&str] = &[
    "company",
    "job_title",
    "employer",
    "employment_start",
    "employment_end",
    "job_description",
    "job_location",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Education,
    Employment,
}

fn block_of(ats_type: &str) -> Option<Block> {
    let ats_type = ats_type.to_ascii_lowercase();
    if EDUCATION_TYPES.contains(&ats_type.as_str()) {
        Some(Block::Education)
    } else if EMPLOYMENT_TYPES.contains(&ats_type.as_str()) {
        Some(Block::Employment)
    } else {
        None
    }
}

/// Values and fields for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    /// Local index (stringified) to value.
    pub values: BTreeMap<String, String>,
    pub fields: Vec<FieldDescriptor>,
}

impl FramePlan {
    pub fn wants_resume(&self) -> bool {
        self.values.values().any(|v| v == RESUME_SENTINEL)
    }

    fn is_dispatched(&self, field: &FieldDescriptor) -> bool {
        self.values.contains_key(&field.local_index.to_string())
    }
}

/// Everything the dispatch stage sends, by frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchPlan {
    pub frames: BTreeMap<FrameId, FramePlan>,
    /// Values withheld because the profile has fewer entries of that block.
    pub dropped_by_cap: usize,
}

impl DispatchPlan {
    /// Partition `mappings` over the frames of `fields`.
    ///
    /// Blank and unfillable values are left out. File fields without a value
    /// get [`RESUME_SENTINEL`]. Each education or employment ATS type keeps at
    /// most as many values as the profile has entries of that block, earliest
    /// fields first; a profile with no entries of a block imposes no cap.
    pub fn build(fields: &[FieldDescriptor], mappings: &Mappings, context: &AutofillContext) -> Self {
        let caps = [
            (Block::Education, context.education_count()),
            (Block::Employment, context.experience_count()),
        ];
        let cap_for = |block: Block| {
            caps.iter()
                .find(|(b, _)| *b == block)
                .map(|(_, n)| *n)
                .filter(|n| *n > 0)
        };

        let mut ordered: Vec<&FieldDescriptor> = fields.iter().collect();
        ordered.sort_by_key(|f| f.index);

        let mut plan = DispatchPlan::default();
        let mut per_type: HashMap<String, usize> = HashMap::new();

        for field in ordered {
            let frame = plan.frames.entry(field.frame_id).or_default();
            frame.fields.push(field.clone());

            let mapped = mappings.get(&field.fingerprint).and_then(|m| m.fill_value());
            let value = match mapped {
                Some(value) => value.to_string(),
                None if field.is_file() => RESUME_SENTINEL.to_string(),
                None => continue,
            };

            if let Some(ats_type) = field.ats_type() {
                if let Some(cap) = block_of(ats_type).and_then(cap_for) {
                    let seen = per_type.entry(ats_type.to_ascii_lowercase()).or_insert(0);
                    if *seen >= cap {
                        plan.dropped_by_cap += 1;
                        continue;
                    }
                    *seen += 1;
                }
            }

            frame.values.insert(field.local_index.to_string(), value);
        }
        plan
    }

    pub fn value_count(&self) -> usize {
        self.frames.values().map(|f| f.values.len()).sum()
    }

    pub fn wants_resume(&self) -> bool {
        self.frames.values().any(FramePlan::wants_resume)
    }

    /// Fingerprints of fields that receive a value, first seen first.
    pub fn dispatched_fingerprints(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.frames
            .values()
            .flat_map(|frame| frame.fields.iter().filter(move |f| frame.is_dispatched(f)))
            .filter(|f| !f.fingerprint.is_empty())
            .filter(|f| seen.insert(f.fingerprint.as_str()))
            .map(|f| f.fingerprint.clone())
            .collect()
    }

    /// Give dispatched fields without a selector the best learned one.
    ///
    /// Returns how many fields got a hint.
    pub fn apply_selector_hints(&mut self, hints: &SelectorHints) -> usize {
        let mut applied = 0;
        for frame in self.frames.values_mut() {
            let dispatched: HashSet<usize> = frame
                .fields
                .iter()
                .filter(|f| frame.is_dispatched(f))
                .map(|f| f.local_index)
                .collect();
            for field in frame.fields.iter_mut() {
                let has_selector = field.selector.as_deref().is_some_and(|s| !s.trim().is_empty());
                if has_selector || !dispatched.contains(&field.local_index) {
                    continue;
                }
                if let Some(best) = hints.get(&field.fingerprint).and_then(|list| list.first()) {
                    field.selector = Some(best.selector.clone());
                    applied += 1;
                }
            }
        }
        applied
    }

    /// The fill request for `frame`. Frames without fields get an empty one.
    pub fn request_for(&self, frame: FrameId, scope: &str, resume: Option<&ResumeData>) -> FillRequest {
        let plan = self.frames.get(&frame);
        let resume_data = plan
            .filter(|p| p.wants_resume())
            .and_then(|_| resume.cloned());
        FillRequest {
            values: plan.map(|p| p.values.clone()).unwrap_or_default(),
            fields_for_frame: plan.map(|p| p.fields.clone()).unwrap_or_default(),
            resume_data,
            scope: scope.to_string(),
            last_fill: true,
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
