//! The caller-facing canonical error: every failure below the dispatch
//! boundary converges losslessly into one of these kinds.
//!
//! ```rust
//! use pdispatch::{DispatchError, DispatchErrorKind};
//! use pprovider::VendorError;
//!
//! let error = DispatchError::from(VendorError::rate_limited("slow down"));
//! assert_eq!(error.kind, DispatchErrorKind::RateLimited);
//! assert!(error.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use pprompt::TemplateError;
use pprovider::{RegistryError, RegistryErrorKind, VendorError, VendorErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    UnknownVendor,
    DuplicateVendor,
    Auth,
    RateLimited,
    InvalidRequest,
    VendorFault,
    Canceled,
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub message: String,
    pub retryable: bool,
    pub retry_after: Option<Duration>,
}

impl DispatchError {
    pub fn new(kind: DispatchErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            retry_after: None,
        }
    }

    pub fn unknown_vendor(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::UnknownVendor, message, false)
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Canceled, message, false)
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for DispatchError {}

impl From<VendorError> for DispatchError {
    fn from(value: VendorError) -> Self {
        let kind = match value.kind {
            VendorErrorKind::Auth => DispatchErrorKind::Auth,
            VendorErrorKind::RateLimited => DispatchErrorKind::RateLimited,
            VendorErrorKind::InvalidRequest => DispatchErrorKind::InvalidRequest,
            VendorErrorKind::VendorFault => DispatchErrorKind::VendorFault,
            VendorErrorKind::Canceled => DispatchErrorKind::Canceled,
        };

        Self {
            kind,
            message: value.message,
            retryable: value.retryable,
            retry_after: value.retry_after,
        }
    }
}

impl From<RegistryError> for DispatchError {
    fn from(value: RegistryError) -> Self {
        let (kind, retryable) = match value.kind {
            RegistryErrorKind::DuplicateVendor => (DispatchErrorKind::DuplicateVendor, false),
            RegistryErrorKind::UnknownVendor => (DispatchErrorKind::UnknownVendor, false),
            RegistryErrorKind::VendorUnavailable => (DispatchErrorKind::VendorFault, true),
        };

        Self::new(kind, value.message, retryable)
    }
}

impl From<TemplateError> for DispatchError {
    fn from(value: TemplateError) -> Self {
        Self::new(DispatchErrorKind::Template, value.message, false)
    }
}
