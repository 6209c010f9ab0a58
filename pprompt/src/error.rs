//! Template rendering errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    pub message: String,
    /// The placeholder name that triggered the failure, when one did.
    pub variable: Option<String>,
}

impl TemplateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            variable: None,
        }
    }

    pub fn missing_variable(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self {
            message: format!("template references unsupplied variable '{variable}'"),
            variable: Some(variable),
        }
    }

    pub fn unterminated_placeholder() -> Self {
        Self::new("template contains an unterminated '{{' placeholder")
    }
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TemplateError: {}", self.message)
    }
}

impl Error for TemplateError {}
