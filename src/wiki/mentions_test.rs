use super::*;

#[test]
fn extracts_ids_in_order_without_duplicates() {
    let content = "Ping @[Ann](aaaa1111) and @[Bo](bbbb2222), then @[Ann](aaaa1111) again.";
    assert_eq!(extract_mentions(content), vec!["aaaa1111", "bbbb2222"]);
}

#[test]
fn plain_text_has_no_mentions() {
    assert!(extract_mentions("").is_empty());
    assert!(extract_mentions("email me at ann@example.com").is_empty());
    assert!(extract_mentions("markdown [link](https://x.y)").is_empty());
}

#[test]
fn malformed_tokens_are_skipped() {
    let content = "@[](empty0001) @[No id]() @[Space](a b) @[Open](abc @[Ok](cccc3333)";
    assert_eq!(extract_mentions(content), vec!["cccc3333"]);
}

#[test]
fn unterminated_name_stops_scanning() {
    assert!(extract_mentions("@[Ann").is_empty());
    assert_eq!(
        extract_mentions("@[Ann](aaaa1111) trailing @[Bo"),
        vec!["aaaa1111"]
    );
}

#[test]
fn names_may_contain_unicode_and_punctuation() {
    assert_eq!(
        extract_mentions("cc @[José O'Brien-Ñ](dddd4444)!"),
        vec!["dddd4444"]
    );
}
