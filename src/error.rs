use thiserror::Error;

/// Errors surfaced by the browsing layer.
///
/// Remote and transport failures are retry-able from the user's point of view;
/// everything else either blocks an action (validation, guest restrictions) or
/// means the caller has to sign in again.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("remote error ({status}): {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("guests cannot {0}, sign up to continue")]
    GuestRestricted(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        AppError::Remote {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Network and remote failures get a generic "try again" treatment.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::Remote { .. } | AppError::Decode(_)
        )
    }

    /// Guests are redirected to sign-up instead of being shown an error.
    pub fn requires_sign_up(&self) -> bool {
        matches!(self, AppError::GuestRestricted(_))
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            e if e.is_retryable() => "Something went wrong. Please try again.".to_string(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound(what) => format!("This {what} is no longer available."),
            AppError::Unauthenticated => "Please sign in to continue.".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_are_retryable() {
        let err = AppError::remote(503, "unavailable");
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }

    #[test]
    fn validation_message_is_shown_inline() {
        let err = AppError::validation("email", "Enter a valid email address");
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "Enter a valid email address");
    }

    #[test]
    fn guest_restriction_redirects_to_sign_up() {
        assert!(AppError::GuestRestricted("save favorites").requires_sign_up());
        assert!(!AppError::Unauthenticated.requires_sign_up());
    }
}
