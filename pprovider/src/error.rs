//! Canonical vendor error kinds and error value helpers.
//!
//! Every vendor-specific failure is translated into exactly one of these
//! kinds at the adapter boundary; nothing vendor-specific crosses it except
//! the human-readable detail string.
//!
//! ```rust
//! use pprovider::VendorError;
//!
//! let auth = VendorError::auth("bad key");
//! assert!(!auth.retryable);
//!
//! let timeout = VendorError::timeout("deadline expired");
//! assert!(timeout.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorErrorKind {
    Auth,
    RateLimited,
    InvalidRequest,
    VendorFault,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorError {
    pub kind: VendorErrorKind,
    pub message: String,
    pub retryable: bool,
    /// Vendor-supplied backpressure hint, set on rate-limit responses that
    /// carry a `Retry-After` value.
    pub retry_after: Option<Duration>,
}

impl VendorError {
    pub fn new(kind: VendorErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            retry_after: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(VendorErrorKind::Auth, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(VendorErrorKind::RateLimited, message, true)
    }

    pub fn rate_limited_after(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::rate_limited(message).with_retry_after(retry_after)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(VendorErrorKind::InvalidRequest, message, false)
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::new(VendorErrorKind::VendorFault, message, true)
    }

    /// Deadline expiry is a retryable flavor of `VendorFault`.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(VendorErrorKind::VendorFault, message, true)
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(VendorErrorKind::Canceled, message, false)
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

impl Display for VendorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for VendorError {}
