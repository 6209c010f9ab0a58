//! Pattern and strategy input types.
//!
//! Both arrive as already-loaded plain data; the pipeline never reads
//! storage. A pattern names a reusable system/user template, a strategy
//! wraps assembled content in prefix/suffix text to steer reasoning style.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub system: String,
    pub user_template: Option<String>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: system.into(),
            user_template: None,
        }
    }

    pub fn with_user_template(mut self, user_template: impl Into<String>) -> Self {
        self.user_template = Some(user_template.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub name: String,
    pub prefix: String,
    pub suffix: String,
}

impl Strategy {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}
