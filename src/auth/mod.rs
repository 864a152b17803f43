//! Credentials: password hashing, session tokens and input validation.
//!
//! Passwords are stored as Argon2id PHC strings. Session tokens are random
//! URL-safe strings handed to the client once; the database only ever sees
//! their SHA-256 digest.

mod password;
mod token;

#[cfg(test)]
mod password_test;
#[cfg(test)]
mod token_test;

use miette::Diagnostic;
use thiserror::Error;

pub use password::{MIN_PASSWORD_LEN, hash_password, validate_password, verify_password};
pub use token::{generate_session_token, hash_token, normalize_email, validate_email};

/// Authentication errors.
#[derive(Error, Diagnostic, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    #[diagnostic(code(docuflow::auth::invalid_credentials))]
    InvalidCredentials,

    #[error("Validation error: {message}")]
    #[diagnostic(code(docuflow::auth::validation))]
    Validation { message: String },

    #[error("Password hashing failed: {message}")]
    #[diagnostic(code(docuflow::auth::hash))]
    Hash { message: String },
}

pub type AuthResult<T> = Result<T, AuthError>;
