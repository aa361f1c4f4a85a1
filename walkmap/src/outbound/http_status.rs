//! Status and transport classification shared by the HTTP adapters.
//!
//! Each adapter maps a [`FailureClass`] onto its own port error enum so the
//! 429/408/504/4xx/5xx split stays identical across backends.

use reqwest::StatusCode;

/// Transport-neutral category of a failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FailureClass {
    Transport(String),
    Timeout(String),
    RateLimited(String),
    NotFound(String),
    InvalidRequest(String),
}

/// Classify a reqwest error raised before a response arrived.
pub(crate) fn classify_transport(error: &reqwest::Error) -> FailureClass {
    if error.is_timeout() {
        FailureClass::Timeout(error.to_string())
    } else {
        FailureClass::Transport(error.to_string())
    }
}

/// Classify a non-success status, quoting a compact body preview.
pub(crate) fn classify_status(status: StatusCode, body: &[u8]) -> FailureClass {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => FailureClass::RateLimited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => FailureClass::Timeout(message),
        StatusCode::NOT_FOUND => FailureClass::NotFound(message),
        _ if status.is_client_error() => FailureClass::InvalidRequest(message),
        _ => FailureClass::Transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Resolve `path` against `base`, treating `base` as a directory.
///
/// # Errors
///
/// Returns the parse error when `path` cannot be joined.
pub(crate) fn join_path(base: &reqwest::Url, path: &str) -> Result<reqwest::Url, url::ParseError> {
    if base.path().ends_with('/') {
        base.join(path)
    } else {
        let mut directory = base.clone();
        directory.set_path(&format!("{}/", base.path()));
        directory.join(path)
    }
}
