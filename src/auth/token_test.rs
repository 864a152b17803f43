use super::*;

#[test]
fn tokens_are_url_safe_and_unique() {
    let a = generate_session_token();
    let b = generate_session_token();

    // 32 bytes in unpadded base64
    assert_eq!(a.len(), 43);
    assert!(
        a.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
    assert_ne!(a, b);
}

#[test]
fn hash_token_is_stable_sha256_hex() {
    assert_eq!(
        hash_token("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(hash_token("abc"), hash_token("abc"));
    assert_ne!(hash_token("abc"), hash_token("abd"));
}

#[test]
fn email_validation() {
    assert!(validate_email("a@b").is_ok());
    assert!(validate_email("  user@example.com ").is_ok());

    for bad in ["", "plain", "@example.com", "user@", "a@b@c", "a b@c.d"] {
        assert!(
            matches!(validate_email(bad), Err(AuthError::Validation { .. })),
            "expected '{}' to be rejected",
            bad
        );
    }
}

#[test]
fn normalize_email_trims_and_lowercases() {
    assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
}
