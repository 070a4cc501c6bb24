//! Gitea API error detection and classification
//!
//! Turns non-success HTTP responses into status-bearing errors, pulling the
//! human readable reason out of Gitea's JSON error bodies.

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use crate::error::{GiteaLinkError, Result};

/// Error body shapes returned by Gitea
///
/// REST endpoints answer `{"message": ..}`, the OAuth endpoints answer
/// `{"error": .., "error_description": ..}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Pass successful responses through, classify the rest
pub async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Build an API error from a status and raw body
pub fn classify_status(status: StatusCode, body: &str) -> GiteaLinkError {
    GiteaLinkError::Api {
        status: status.as_u16(),
        message: extract_message(status, body),
    }
}

fn extract_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let reason = match (parsed.message, parsed.error, parsed.error_description) {
        (Some(message), _, _) if !message.is_empty() => Some(message),
        (_, Some(error), Some(description)) => Some(format!("{}: {}", error, description)),
        (_, Some(error), None) => Some(error),
        _ => None,
    };

    reason.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    })
}

/// Check if the error is a 404 not found
pub fn is_not_found(err: &GiteaLinkError) -> bool {
    err.status() == Some(StatusCode::NOT_FOUND.as_u16())
}

/// Check if the error means the credential was rejected
pub fn is_unauthorized(err: &GiteaLinkError) -> bool {
    matches!(err.status(), Some(401) | Some(403))
}

/// Attempt to open a URL in the default browser
///
/// Returns true if the browser was successfully launched, false otherwise.
#[allow(unused_variables)]
pub fn open_browser(url: &str) -> bool {
    use std::process::Command;

    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .is_ok()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_message_is_extracted() {
        let err = classify_status(
            StatusCode::CONFLICT,
            r#"{"message":"sha does not match","url":"https://git.example.com/api/swagger"}"#,
        );
        match err {
            GiteaLinkError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "sha does not match");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn test_oauth_error_is_extracted() {
        let err = classify_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"refresh token expired"}"#,
        );
        assert!(err.to_string().contains("invalid_grant: refresh token expired"));
    }

    #[test]
    fn test_empty_body_falls_back_to_reason() {
        let err = classify_status(StatusCode::BAD_GATEWAY, "");
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_status_helpers() {
        assert!(is_not_found(&classify_status(StatusCode::NOT_FOUND, "")));
        assert!(!is_not_found(&classify_status(StatusCode::GONE, "")));
        assert!(is_unauthorized(&classify_status(StatusCode::UNAUTHORIZED, "")));
        assert!(is_unauthorized(&classify_status(StatusCode::FORBIDDEN, "")));
    }
}
