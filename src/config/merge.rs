//! Field-by-field merging of configuration tiers.
//!
//! Mappings merge recursively. Scalars and sequences from the higher tier
//! replace the lower tier's value whole, so `selected_tags: []` in a user
//! file really does clear a project's tag selection.

use serde_json::Value;

/// Merge `overlay` on top of `base`.
///
/// A `null` in the overlay means "not specified" and keeps the base value.
///
/// # Example
/// ```
/// use serde_json::json;
/// use checklist_graph::config::deep_merge;
///
/// let project = json!({
///     "view": { "task_limit": 200, "use_dates": true },
///     "vault": { "extensions": ["md", "markdown"] }
/// });
/// let user = json!({
///     "view": { "task_limit": 50 },
///     "vault": { "extensions": ["md"] }
/// });
/// let merged = deep_merge(project, user);
/// assert_eq!(merged["view"]["task_limit"], 50);
/// assert_eq!(merged["view"]["use_dates"], true);
/// assert_eq!(merged["vault"]["extensions"], json!(["md"]));
/// ```
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

fn merge_into(slot: &mut Value, overlay: Value) {
    match (slot, overlay) {
        (_, Value::Null) => {}
        (Value::Object(target), Value::Object(fields)) => {
            for (key, value) in fields {
                match target.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// Merge tiers lowest first; later entries win.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
