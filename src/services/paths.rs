//! Normalization of generated file paths before export.

const NESTED_UI: &str = "components/ui/ui/";
const FLAT_UI: &str = "components/ui/";

/// Normalize a generated path.
///
/// Collapses the generator's `components/ui/ui/` nesting first, then removes
/// any segment that repeats the one before it. Empty segments are dropped.
/// The result is stable under re-normalization.
pub fn normalize_path(path: &str) -> String {
    let mut collapsed = path.to_string();
    while collapsed.contains(NESTED_UI) {
        collapsed = collapsed.replace(NESTED_UI, FLAT_UI);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in collapsed.split('/').filter(|s| !s.is_empty()) {
        if segments.last() != Some(&segment) {
            segments.push(segment);
        }
    }

    let normalized = segments.join("/");
    if normalized != path {
        tracing::debug!(original = %path, normalized = %normalized, "Normalized file path");
    }
    normalized
}
