use super::*;

#[test]
fn hash_then_verify() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("wrong horse", &hash));
}

#[test]
fn same_password_gets_different_salts() {
    let a = hash_password("hunter22").unwrap();
    let b = hash_password("hunter22").unwrap();
    assert_ne!(a, b);
    assert!(verify_password("hunter22", &a));
    assert!(verify_password("hunter22", &b));
}

#[test]
fn garbage_hash_never_verifies() {
    assert!(!verify_password("anything", "not-a-phc-string"));
    assert!(!verify_password("", ""));
}

#[test]
fn password_length_is_checked_in_characters() {
    assert!(validate_password("1234567").is_err());
    assert!(validate_password("12345678").is_ok());
    // Eight multi-byte characters are enough
    assert!(validate_password("ääääääää").is_ok());
}
