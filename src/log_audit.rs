// Static scan of every `tracing::` call in the crate for patient-identifying
// fields. Logs carry opaque ids, enum tags and counts only.
