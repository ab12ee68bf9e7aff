//! Response Payload Extraction
//!
//! Models sometimes wrap their JSON in commentary ("Here is your result:")
//! or markdown. The extractor keeps only the outermost object, from the first
//! `{` to the last `}`; parsing and validation are a separate step so a bad
//! payload surfaces as `MalformedResponse` rather than a crash.

use tracing::debug;

use crate::types::{CopyError, Result, StructuredArtifact};

/// Outermost `{ ... }` span of `raw`, or `raw` unchanged when there is none
pub fn extract_payload(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

/// Extract, parse and validate a structured artifact
pub fn parse_artifact<T: StructuredArtifact>(raw: &str) -> Result<T> {
    let payload = extract_payload(raw);
    if payload.len() != raw.len() {
        debug!(
            kind = T::KIND,
            dropped_bytes = raw.len() - payload.len(),
            "Stripped prose around payload"
        );
    }

    let artifact: T = serde_json::from_str(payload).map_err(|e| {
        CopyError::malformed(format!(
            "{}: {} (preview: {}...)",
            T::KIND,
            e,
            payload.chars().take(120).collect::<String>()
        ))
    })?;

    artifact.validate()?;
    Ok(artifact)
}
