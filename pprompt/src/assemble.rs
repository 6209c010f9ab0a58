//! The prompt assembly pipeline.
//!
//! Pure function of (pattern, strategy, context, input, options) into a
//! [`ChatRequest`]: no network, no storage, byte-identical output for
//! identical input. The fixed ordering rule:
//!
//! 1. the pattern's rendered system template with the strategy prefix
//!    appended becomes the single leading system message;
//! 2. prior context messages follow in their original order;
//! 3. the rendered user input with the strategy suffix appended becomes
//!    the final user message.
//!
//! Concatenation is exact: overlapping pattern/strategy instruction text is
//! not de-duplicated, and strategy authors own their separators.
//!
//! ```rust
//! use pcommon::GenerationOptions;
//! use pprompt::{Pattern, assemble};
//!
//! let pattern = Pattern::new("summarize", "Summarize the text.");
//! let request = assemble(
//!     Some(&pattern),
//!     None,
//!     &[],
//!     "The sky is blue.",
//!     GenerationOptions::default(),
//! )
//! .expect("assembly works");
//!
//! assert_eq!(request.messages.len(), 2);
//! assert_eq!(request.messages[0].content, "Summarize the text.");
//! assert_eq!(request.messages[1].content, "The sky is blue.");
//! ```

use pcommon::GenerationOptions;
use pprovider::{ChatMessage, ChatRequest, Role};

use crate::template::{TemplateVars, render};
use crate::{Pattern, Strategy, TemplateError};

pub const INPUT_VARIABLE: &str = "input";

/// Assembles a request with no extra template variables beyond `input`.
pub fn assemble(
    pattern: Option<&Pattern>,
    strategy: Option<&Strategy>,
    context: &[ChatMessage],
    input: &str,
    options: GenerationOptions,
) -> Result<ChatRequest, TemplateError> {
    assemble_with_vars(
        pattern,
        strategy,
        context,
        input,
        &TemplateVars::new(),
        options,
    )
}

pub fn assemble_with_vars(
    pattern: Option<&Pattern>,
    strategy: Option<&Strategy>,
    context: &[ChatMessage],
    input: &str,
    vars: &TemplateVars,
    options: GenerationOptions,
) -> Result<ChatRequest, TemplateError> {
    let mut resolved_vars = vars.clone();
    resolved_vars.insert(INPUT_VARIABLE.to_string(), input.to_string());

    let mut messages = Vec::with_capacity(context.len() + 2);

    let mut system_text = match pattern {
        Some(pattern) => render(&pattern.system, &resolved_vars)?,
        None => String::new(),
    };
    if let Some(strategy) = strategy {
        system_text.push_str(&strategy.prefix);
    }
    if !system_text.is_empty() {
        messages.push(ChatMessage::new(Role::System, system_text));
    }

    messages.extend(context.iter().cloned());

    let mut user_text = match pattern.and_then(|pattern| pattern.user_template.as_deref()) {
        Some(template) => render(template, &resolved_vars)?,
        None => input.to_string(),
    };
    if let Some(strategy) = strategy {
        user_text.push_str(&strategy.suffix);
    }
    messages.push(ChatMessage::new(Role::User, user_text));

    // The model is stamped at dispatch time; assembly only shapes messages.
    Ok(ChatRequest::new("", messages).with_options(options))
}

/// Owned-value builder over [`assemble_with_vars`], for callers that
/// accumulate assembly state incrementally.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembly {
    input: String,
    pattern: Option<Pattern>,
    strategy: Option<Strategy>,
    context: Vec<ChatMessage>,
    vars: TemplateVars,
    options: GenerationOptions,
}

impl PromptAssembly {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_context(mut self, context: Vec<ChatMessage>) -> Self {
        self.context = context;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn assemble(self) -> Result<ChatRequest, TemplateError> {
        assemble_with_vars(
            self.pattern.as_ref(),
            self.strategy.as_ref(),
            &self.context,
            &self.input,
            &self.vars,
            self.options,
        )
    }
}
