//! Internationalized domain names.

use tracing::debug;

use crate::labels::LabelSequence;

/// Convert a single label to its ASCII-compatible (punycode) form.
///
/// Labels that fail IDNA processing, or come back empty, are returned as-is.
pub fn label_to_ascii(label: &str) -> String {
    match idna::domain_to_ascii(label) {
        Ok(ascii) if !ascii.is_empty() => ascii,
        Ok(_) => label.to_string(),
        Err(e) => {
            debug!(label = %label, error = ?e, "IDNA conversion failed, keeping label");
            label.to_string()
        }
    }
}

/// Punycode every label independently.
pub fn to_ascii_labels(labels: &LabelSequence) -> LabelSequence {
    labels.map_labels(|label| label_to_ascii(label))
}
