//! HTTP status and transport failure mapping shared by the adapters.
//!
//! Status codes carry the same canonical meaning across vendors; only the
//! error body envelope differs, so each adapter extracts its own detail
//! string and funnels it through here.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};

use crate::VendorError;

pub(crate) fn map_status(
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> VendorError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VendorError::auth(message),
        StatusCode::TOO_MANY_REQUESTS => match retry_after {
            Some(delay) => VendorError::rate_limited_after(message, delay),
            None => VendorError::rate_limited(message),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => VendorError::timeout(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            VendorError::invalid_request(message)
        }
        _ => VendorError::fault(message),
    }
}

pub(crate) fn map_send_error(err: reqwest::Error) -> VendorError {
    if err.is_timeout() {
        VendorError::timeout(err.to_string())
    } else {
        VendorError::fault(err.to_string())
    }
}

pub(crate) fn parse_retry_after(response: &Response) -> Option<Duration> {
    let header = response.headers().get(RETRY_AFTER)?;
    let seconds = header.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}
