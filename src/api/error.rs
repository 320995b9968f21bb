use reqwest::StatusCode;
use serde::Deserialize;

/// Non-success response from the panel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Build an error from a response status and its raw body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if let Some(message) = extract_message(body) {
            return Self::new(status.as_u16(), message);
        }

        let message = if body.trim().is_empty() {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        } else {
            body.trim().to_string()
        };
        Self::new(status.as_u16(), message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED.as_u16()
            || self.status == StatusCode::FORBIDDEN.as_u16()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    errors: Vec<ErrorEntry>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorEntry {
    code: Option<String>,
    detail: Option<String>,
}

fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;

    let from_errors = parsed.errors.into_iter().find_map(|entry| {
        entry
            .detail
            .filter(|d| !d.is_empty())
            .or(entry.code.filter(|c| !c.is_empty()))
    });

    from_errors
        .or(parsed.message.filter(|m| !m.is_empty()))
        .or(parsed.error.filter(|e| !e.is_empty()))
}

/// Turn an error chain into the line shown to the user.
pub fn describe_error(err: &anyhow::Error) -> String {
    let Some(api) = err.chain().find_map(|cause| cause.downcast_ref::<ApiError>()) else {
        return format!("Error: {:#}", err);
    };

    if api.is_not_found() {
        format!("Resource not found: {}", api.message)
    } else if api.is_unauthorized() {
        format!(
            "Authentication failed: {}\n  Tip: check the API token for this command",
            api.message
        )
    } else if api.status >= 500 {
        format!(
            "Server error: {}\n  The Pelican panel may be experiencing issues",
            api.message
        )
    } else if api.status >= 400 {
        format!("Request error: {}", api.message)
    } else {
        api.to_string()
    }
}
