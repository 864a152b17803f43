//! Shared helper functions for SQLite repositories.

use crate::db::{PageSort, SortOrder};

/// Validate and map a sort field to the actual column name.
/// Returns None for invalid fields (falls back to default).
pub fn validate_sort_field(field: &str, allowed: &[&str]) -> Option<&'static str> {
    if !allowed.contains(&field) {
        return None;
    }
    // Return static str to avoid lifetime issues
    match field {
        "title" => Some("title"),
        "name" => Some("name"),
        "email" => Some("email"),
        "company" => Some("company"),
        "idx" => Some("idx"),
        "version" => Some("version"),
        "started_at" => Some("started_at"),
        "ended_at" => Some("ended_at"),
        "captured_at" => Some("captured_at"),
        "created_at" => Some("created_at"),
        "updated_at" => Some("updated_at"),
        _ => None,
    }
}

/// Build ORDER BY clause from PageSort parameters.
///
/// `prefix` qualifies the column (e.g. `"d."`) when the query joins tables.
pub fn build_order_clause(
    page: &PageSort,
    allowed_fields: &[&str],
    default_field: &str,
    default_order: SortOrder,
    prefix: &str,
) -> String {
    let sort_field = page
        .sort_by
        .as_deref()
        .and_then(|f| validate_sort_field(f, allowed_fields))
        .unwrap_or(default_field);

    let order = match page.sort_order.unwrap_or(default_order) {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    // id as tie-breaker keeps pagination stable for equal timestamps
    format!(
        "ORDER BY {prefix}{sort_field} {order}, {prefix}id {order}",
        prefix = prefix,
        sort_field = sort_field,
        order = order
    )
}

/// Build LIMIT/OFFSET clause from PageSort parameters.
/// Note: SQL requires LIMIT when using OFFSET. If offset is provided without limit,
/// we use LIMIT -1 (SQLite's "no limit" value).
pub fn build_limit_offset_clause(page: &PageSort) -> String {
    let mut clause = String::new();

    let offset = page.offset.filter(|o| *o > 0);

    if let Some(limit) = page.limit {
        clause.push_str(&format!(" LIMIT {}", limit));
    } else if offset.is_some() {
        clause.push_str(" LIMIT -1");
    }

    if let Some(offset) = offset {
        clause.push_str(&format!(" OFFSET {}", offset));
    }

    clause
}

/// Turn free text into a LIKE pattern matching it as a substring.
///
/// `%`, `_` and `\` are escaped; queries using the pattern must declare
/// `ESCAPE '\'`. Returns None for empty/whitespace-only input.
pub fn like_pattern(search: &str) -> Option<String> {
    let trimmed = search.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("%{}%", escape_like(trimmed)))
}

/// LIKE pattern matching values that start with `prefix` (escaped as above).
pub fn prefix_pattern(prefix: &str) -> String {
    format!("{}%", escape_like(prefix.trim()))
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Serialize a tag list for the JSON `tags` column.
pub fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Parse the JSON `tags` column, treating malformed data as empty.
pub fn tags_from_json(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_clause_uses_default_for_unknown_field() {
        let page = PageSort {
            sort_by: Some("password_hash".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_order_clause(&page, &["title"], "created_at", SortOrder::Asc, ""),
            "ORDER BY created_at ASC, id ASC"
        );
    }

    #[test]
    fn order_clause_rejects_field_not_in_allow_list() {
        let page = PageSort {
            sort_by: Some("email".to_string()),
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        };
        assert_eq!(
            build_order_clause(&page, &["name"], "name", SortOrder::Asc, "c."),
            "ORDER BY c.name DESC, c.id DESC"
        );
    }

    #[test]
    fn order_clause_honours_allowed_field() {
        let page = PageSort {
            sort_by: Some("title".to_string()),
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        };
        assert_eq!(
            build_order_clause(&page, &["title"], "created_at", SortOrder::Asc, "d."),
            "ORDER BY d.title DESC, d.id DESC"
        );
    }

    #[test]
    fn limit_offset_clause_variants() {
        let none = PageSort::default();
        assert_eq!(build_limit_offset_clause(&none), "");

        let limit_only = PageSort {
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(build_limit_offset_clause(&limit_only), " LIMIT 10");

        let offset_only = PageSort {
            offset: Some(5),
            ..Default::default()
        };
        assert_eq!(build_limit_offset_clause(&offset_only), " LIMIT -1 OFFSET 5");

        let zero_offset = PageSort {
            limit: Some(3),
            offset: Some(0),
            ..Default::default()
        };
        assert_eq!(build_limit_offset_clause(&zero_offset), " LIMIT 3");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), Some("%50\\%\\_off%".to_string()));
        assert_eq!(like_pattern("  rust "), Some("%rust%".to_string()));
        assert_eq!(like_pattern("   "), None);
    }

    #[test]
    fn prefix_pattern_only_wildcards_the_tail() {
        assert_eq!(prefix_pattern("ad"), "ad%");
        assert_eq!(prefix_pattern(""), "%");
        assert_eq!(prefix_pattern("a_b"), "a\\_b%");
    }

    #[test]
    fn tags_json_tolerates_garbage() {
        assert_eq!(tags_from_json("not json"), Vec::<String>::new());
        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(tags_from_json(&tags_to_json(&tags)), tags);
    }
}
