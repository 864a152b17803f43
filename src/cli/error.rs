use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error("Failed to connect to API server")]
    #[diagnostic(
        code(docuflow::cli::connection_failed),
        help(
            "Is the API server running? Try: docuflow api\nOr set DOCUFLOW_API_URL to point to the correct server."
        )
    )]
    ConnectionFailed {
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid response from API server: {message}")]
    #[diagnostic(
        code(docuflow::cli::invalid_response),
        help(
            "The server returned data in an unexpected format. This might indicate a version mismatch."
        )
    )]
    InvalidResponse { message: String },

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(docuflow::cli::api_error))]
    ApiError { status: u16, message: String },

    #[error("No session token")]
    #[diagnostic(
        code(docuflow::cli::missing_token),
        help("Pass --token or set DOCUFLOW_TOKEN to a token from /api/v1/auth/login")
    )]
    MissingToken,

    #[error("No team selected")]
    #[diagnostic(
        code(docuflow::cli::missing_team),
        help("Pass --team or set DOCUFLOW_TEAM to a team id")
    )]
    MissingTeam,
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            CliError::ConnectionFailed { source: e }
        } else {
            CliError::InvalidResponse {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::InvalidResponse {
            message: e.to_string(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
