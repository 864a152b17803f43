//! Helpers for PATCH payloads with clearable fields.
//!
//! Optional text fields such as a document's `icon` or a client's `phone`
//! have three states in a PATCH body: left out (keep the stored value),
//! `null` (clear it) or a value (replace it).

use serde::{Deserialize, Deserializer};

/// Deserialize a clearable field into `Option<Option<T>>`.
///
/// Pair with `#[serde(default)]` so a missing field becomes `None`:
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct PatchDocumentRequest {
///     // {"icon": null} clears the icon, {} leaves it alone
///     #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
///     icon: Option<Option<String>>,
/// }
/// ```
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    // Only called when the field is present, so null maps to Some(None)
    Option::<T>::deserialize(de).map(Some)
}

/// Apply a clearable text field to `target`.
///
/// A blank string clears the field like `null` does.
pub fn apply_clearable(target: &mut Option<String>, patch: Option<Option<String>>) {
    if let Some(value) = patch {
        *target = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
}
