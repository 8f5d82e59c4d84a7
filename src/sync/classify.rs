use crate::app::BrookError;

pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection.";
pub const AUTH_MESSAGE: &str = "Authentication failed. Please re-authenticate.";
pub const SERVER_MESSAGE: &str = "Server error. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Authentication,
    Server,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub user_message: String,
    pub retryable: bool,
}

/// Maps sync failures to the message shown to the user.
///
/// Checks run in a fixed order and the first match wins: network,
/// authentication, server, then a generic fallback quoting the error.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(error: &BrookError) -> ClassifiedError {
        let message = error.to_string();
        let lower = message.to_lowercase();
        let status = Self::status_of(error);

        if Self::is_network(error, &lower) {
            return ClassifiedError {
                kind: ErrorKind::Network,
                user_message: NETWORK_MESSAGE.to_string(),
                retryable: true,
            };
        }

        if status == Some(401) || lower.contains("401") || lower.contains("unauthorized") {
            return ClassifiedError {
                kind: ErrorKind::Authentication,
                user_message: AUTH_MESSAGE.to_string(),
                retryable: false,
            };
        }

        if status.is_some_and(|s| (500..600).contains(&s))
            || Self::mentions_server_status(&lower)
            || lower.contains("server error")
        {
            return ClassifiedError {
                kind: ErrorKind::Server,
                user_message: SERVER_MESSAGE.to_string(),
                retryable: true,
            };
        }

        ClassifiedError {
            kind: ErrorKind::Unclassified,
            user_message: format!("Sync failed: {}", message),
            retryable: true,
        }
    }

    fn status_of(error: &BrookError) -> Option<u16> {
        match error {
            BrookError::Api { status, .. } => Some(*status),
            BrookError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn is_network(error: &BrookError, lower: &str) -> bool {
        if let BrookError::Http(e) = error {
            if e.is_connect() || e.is_timeout() {
                return true;
            }
        }
        lower.contains("network") || lower.contains("connection") || lower.contains("timed out")
    }

    /// True when the text carries a standalone 5xx code such as "502".
    fn mentions_server_status(lower: &str) -> bool {
        lower
            .split(|c: char| !c.is_ascii_digit())
            .any(|token| token.len() == 3 && token.starts_with('5'))
    }
}
