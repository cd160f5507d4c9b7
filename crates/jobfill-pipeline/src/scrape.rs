//! Scrape stage: ask every frame for its fields and merge the answers.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use jobfill_cache::ensure_fingerprints;
use jobfill_frames::{FrameBroadcastChannel, FrameOutcome};
use jobfill_protocols::{FieldDescriptor, FrameMessage, ScrapeRequest, ScrapeResponse, TabId};

/// Merge per-frame scrape replies into one globally indexed list.
///
/// Frames are taken in id order, fields in the order each frame reported
/// them. A field keeps the index its frame gave it as `local_index` (or its
/// position, when the frame's indices are not unique) and gets a global
/// `index`. Fingerprints missing from the reply are computed.
pub fn merge_frame_fields(outcomes: &[FrameOutcome]) -> Vec<FieldDescriptor> {
    let mut ordered: Vec<&FrameOutcome> = outcomes.iter().collect();
    ordered.sort_by_key(|o| o.frame_id);

    let mut merged = Vec::new();
    for outcome in ordered {
        let response = match outcome.decode::<ScrapeResponse>() {
            Ok(response) => response,
            Err(e) => {
                debug!("No fields from frame {}: {}", outcome.frame_id, e);
                continue;
            }
        };
        if let Some(error) = &response.error {
            warn!("Scraper in frame {} reported: {}", outcome.frame_id, error);
        }

        let mut fields = response.fields;
        let unique: HashSet<usize> = fields.iter().map(|f| f.index).collect();
        let use_reported = unique.len() == fields.len();

        for (position, field) in fields.iter_mut().enumerate() {
            field.frame_id = outcome.frame_id;
            field.local_index = if use_reported { field.index } else { position };
        }
        merged.extend(fields);
    }

    for (global, field) in merged.iter_mut().enumerate() {
        field.index = global;
    }
    let computed = ensure_fingerprints(&mut merged);
    if computed > 0 {
        debug!("Computed {} missing fingerprint(s)", computed);
    }
    merged
}

/// Scrape all frames until some field shows up or attempts run out.
///
/// Attempt `n` is followed by a pause of `n * backoff`, for forms that are
/// still rendering. `on_attempt` is told the number of each attempt.
pub async fn scrape_with_retry<F>(
    channel: &FrameBroadcastChannel,
    tab: &TabId,
    request: &ScrapeRequest,
    attempts: u32,
    backoff: Duration,
    mut on_attempt: F,
) -> Vec<FieldDescriptor>
where
    F: FnMut(u32),
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        on_attempt(attempt);
        let outcomes = channel
            .send_to_all_frames(tab, |_| FrameMessage::ScrapeFields(request.clone()))
            .await;
        let fields = merge_frame_fields(&outcomes);
        if !fields.is_empty() {
            debug!(
                "Scraped {} field(s) from {} frame(s) on attempt {}",
                fields.len(),
                outcomes.len(),
                attempt
            );
            return fields;
        }
        if attempt < attempts {
            let delay = backoff * attempt;
            debug!("No fields on attempt {}, retrying in {:?}", attempt, delay);
            tokio::time::sleep(delay).await;
        }
    }
    Vec::new()
}
