//! Error taxonomy for remote EC2 calls.
//!
//! Distinguishes credential rejections (which demote the session) from
//! transient network/service failures (which leave the session usable) and
//! single-instance lookups that miss. SDK failures arrive as opaque error
//! chains; this module categorizes them by the known EC2 error-code patterns
//! in their string representation. No retry logic lives here or anywhere
//! else: every retry is a fresh user-initiated action.

use std::fmt;
use std::time::Duration;

/// Categorized failure surfaced by every console operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// A required credential or filter field is missing or malformed.
    /// Reported before any network call is attempted.
    Validation(String),
    /// The remote rejected the credentials. The session is marked not-live.
    Unauthorized(String),
    /// Network failure, timeout, throttling or a 5xx. Transient; the user
    /// must retry manually.
    RemoteUnavailable(String),
    /// Single-instance lookup on a nonexistent id.
    NotFound(String),
}

impl ConsoleError {
    /// User-facing message for non-blocking notification display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Unauthorized(msg) => format!("Credentials rejected: {}", msg),
            Self::RemoteUnavailable(msg) => format!("Remote unavailable: {}", msg),
            Self::NotFound(msg) => msg.clone(),
        }
    }

    /// Short label for compact display and log fields.
    pub fn short_label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::RemoteUnavailable(_) => "unavailable",
            Self::NotFound(_) => "not-found",
        }
    }

    /// True when a manual retry of the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for ConsoleError {}

/// Error-code substrings the EC2 control plane uses for credential problems.
const UNAUTHORIZED_PATTERNS: &[&str] = &[
    "AuthFailure",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "RequestExpired",
    "AccessDenied",
    "OptInRequired",
];

/// Substrings indicating a transient failure worth a manual retry.
const TRANSIENT_PATTERNS: &[&str] = &[
    "Throttling",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "InternalError",
    "InternalFailure",
    "Unavailable",
    "DispatchFailure",
    "dispatch failure",
    "connection",
    "timed out",
    "timeout",
];

/// Categorize a failed remote call from its string representation.
///
/// `error_detail` is the debug rendering of the SDK error (which carries the
/// service error code); `operation` names the remote call for messages.
pub fn categorize_remote_failure(error_detail: &str, operation: &str) -> ConsoleError {
    if UNAUTHORIZED_PATTERNS.iter().any(|p| error_detail.contains(p)) {
        let code = extract_error_code(error_detail).unwrap_or_else(|| "AuthFailure".to_string());
        return ConsoleError::Unauthorized(format!("{} ({})", code, operation));
    }

    if error_detail.contains("InvalidInstanceID.NotFound") {
        return ConsoleError::NotFound(format!(
            "{}: no instance matches the requested id",
            operation
        ));
    }

    if error_detail.contains("InvalidInstanceID.Malformed")
        || error_detail.contains("InvalidParameterValue")
    {
        let code =
            extract_error_code(error_detail).unwrap_or_else(|| "InvalidParameter".to_string());
        return ConsoleError::Validation(format!("{} rejected by {}", code, operation));
    }

    if TRANSIENT_PATTERNS.iter().any(|p| error_detail.contains(p)) {
        let code = extract_error_code(error_detail)
            .unwrap_or_else(|| truncate_message(error_detail, 80));
        return ConsoleError::RemoteUnavailable(format!("{} ({})", code, operation));
    }

    // Anything unrecognized is treated as transient so the session stays
    // usable and the user may retry.
    ConsoleError::RemoteUnavailable(format!(
        "{} failed: {}",
        operation,
        truncate_message(error_detail, 120)
    ))
}

/// Bounded-timeout expiry for a remote call.
pub fn call_timeout(operation: &str, limit: Duration) -> ConsoleError {
    ConsoleError::RemoteUnavailable(format!(
        "{} timed out after {}s",
        operation,
        limit.as_secs()
    ))
}

/// Pull the service error code out of an SDK error rendering.
fn extract_error_code(error_str: &str) -> Option<String> {
    // Pattern 1: leading "ErrorCode: message"
    if let Some(prefix) = error_str.split(':').next() {
        let prefix = prefix.trim();
        if !prefix.is_empty()
            && prefix.len() < 50
            && !prefix.contains(' ')
            && prefix.chars().next().is_some_and(|c| c.is_uppercase())
        {
            let code = prefix.rsplit("::").next().unwrap_or(prefix);
            return Some(code.to_string());
        }
    }

    // Pattern 2: code: "ErrorName" in debug output
    if let Some(start) = error_str.find("code:") {
        let after_code = &error_str[start + 5..];
        if let Some(quote_start) = after_code.find('"') {
            let after_quote = &after_code[quote_start + 1..];
            if let Some(quote_end) = after_quote.find('"') {
                let code = &after_quote[..quote_end];
                if !code.is_empty() && code.len() < 50 {
                    return Some(code.to_string());
                }
            }
        }
    }

    None
}

/// Truncate a message to max length, adding ellipsis if truncated.
fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        msg.to_string()
    } else {
        format!("{}...", &msg[..max_len - 3])
    }
}
