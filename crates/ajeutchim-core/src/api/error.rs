use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No account found for this email")]
    UnknownEmail,

    #[error("An account already exists for this email")]
    EmailTaken,

    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    #[error("This account has been disabled")]
    AccountDisabled,

    #[error("Too many attempts - please wait before retrying")]
    RateLimited,

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!("{}... (truncated, {} total bytes)",
                    &body[..MAX_ERROR_BODY_LENGTH],
                    body.len())
        }
    }

    /// Map an auth API error code to a variant.
    ///
    /// The endpoint reports failures as an upper-case code in the error
    /// body's `message` field, sometimes with a detail suffix, e.g.
    /// `"WEAK_PASSWORD : Password should be at least 6 characters"`.
    pub fn from_error_code(code: &str) -> Self {
        let (code_part, detail) = match code.split_once(" : ") {
            Some((c, d)) => (c.trim(), d.trim()),
            None => (code.trim(), ""),
        };
        match code_part {
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => ApiError::InvalidCredentials,
            "EMAIL_NOT_FOUND" => ApiError::UnknownEmail,
            "EMAIL_EXISTS" => ApiError::EmailTaken,
            "WEAK_PASSWORD" => ApiError::WeakPassword(detail.to_string()),
            "USER_DISABLED" => ApiError::AccountDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => ApiError::RateLimited,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" => ApiError::Unauthorized,
            other => ApiError::InvalidResponse(Self::truncate_body(other)),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
