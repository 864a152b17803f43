//! `@[Display Name](user_id)` mentions inside document content.

/// Maximum number of members offered by mention autocomplete.
pub const MENTION_SUGGESTION_LIMIT: usize = 10;

/// Ids of mentioned users, de-duplicated, in order of first appearance.
///
/// Tokens that do not parse (unterminated brackets, empty name or id,
/// whitespace in the id) are skipped.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut ids: Vec<String> = vec![];
    let mut rest = content;

    while let Some(start) = rest.find("@[") {
        rest = &rest[start + 2..];

        let Some(name_end) = rest.find(']') else {
            break;
        };
        let name = &rest[..name_end];
        let after_name = &rest[name_end + 1..];

        if name.is_empty() || name.contains('\n') || !after_name.starts_with('(') {
            continue;
        }

        let Some(id_end) = after_name.find(')') else {
            continue;
        };
        let id = &after_name[1..id_end];
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            continue;
        }

        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
        rest = &after_name[id_end + 1..];
    }

    ids
}
