//! Vendor-agnostic chat request, response, and message model types.
//!
//! ```rust
//! use pprovider::{ChatMessage, ChatRequest, Role, VendorErrorKind};
//!
//! let ok = ChatRequest::new_validated(
//!     "gpt-4o-mini",
//!     vec![ChatMessage::new(Role::User, "Summarize this diff")],
//! );
//! assert!(ok.is_ok());
//!
//! let err = ChatRequest::new_validated("gpt-4o-mini", Vec::new())
//!     .err()
//!     .expect("empty messages should fail");
//! assert_eq!(err.kind, VendorErrorKind::InvalidRequest);
//! ```

use std::collections::BTreeMap;

use pcommon::{GenerationOptions, MetadataMap, VendorName};
use serde_json::Value;

use crate::{VendorError, VendorErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Audio,
}

/// Media reference carried alongside message text. The core never fetches
/// the referenced content; adapters that support the modality forward the
/// reference, others ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub reference: String,
}

impl Attachment {
    pub fn image(reference: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Image,
            reference: reference.into(),
        }
    }

    pub fn audio(reference: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Audio,
            reference: reference.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool input, kept as text until an adapter
    /// translates it into the vendor's tool shape.
    pub input_schema: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCall,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub vendor: VendorName,
    pub model: String,
    pub text: String,
    pub finish: FinishReason,
    pub usage: Option<TokenUsage>,
    /// Opaque vendor payload kept for diagnostics only.
    pub raw: Option<Value>,
}

/// Provider-specific knobs forwarded verbatim to the vendor request body.
/// Adapters serialize what they understand and ignore the rest.
pub type VendorExtras = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: GenerationOptions,
    pub tools: Vec<ToolDefinition>,
    pub extras: VendorExtras,
    pub metadata: MetadataMap,
}

impl ChatRequest {
    pub fn builder(model: impl Into<String>) -> ChatRequestBuilder {
        ChatRequestBuilder::new(model)
    }

    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: GenerationOptions::default(),
            tools: Vec::new(),
            extras: VendorExtras::new(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn new_validated(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
    ) -> Result<Self, VendorError> {
        let request = Self::new(model, messages);
        request.validate()?;
        Ok(request)
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.options.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn enable_streaming(mut self) -> Self {
        self.options.stream = true;
        self
    }

    /// Replaces the target model. Called by the dispatcher when the caller
    /// selects the model at dispatch time rather than at assembly time.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// An empty model is allowed here: adapters substitute their configured
    /// fallback model when the dispatcher did not stamp one.
    pub fn validate(&self) -> Result<(), VendorError> {
        if self.messages.is_empty() {
            return Err(VendorError::invalid_request(
                "at least one message is required",
            ));
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(VendorError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(VendorError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        if let Some(top_p) = self.options.top_p
            && !(0.0..=1.0).contains(&top_p)
        {
            return Err(VendorError::new(
                VendorErrorKind::InvalidRequest,
                "top_p must be in the inclusive range 0.0..=1.0",
                false,
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequestBuilder {
    model: String,
    messages: Vec<ChatMessage>,
    options: GenerationOptions,
    tools: Vec<ToolDefinition>,
    extras: VendorExtras,
    metadata: MetadataMap,
}

impl ChatRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            options: GenerationOptions::default(),
            tools: Vec::new(),
            extras: VendorExtras::new(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.options.top_p = Some(top_p);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.options.stream = stream;
        self
    }

    pub fn enable_streaming(self) -> Self {
        self.streaming(true)
    }

    pub fn build(self) -> Result<ChatRequest, VendorError> {
        let request = ChatRequest {
            model: self.model,
            messages: self.messages,
            options: self.options,
            tools: self.tools,
            extras: self.extras,
            metadata: self.metadata,
        };

        request.validate()?;
        Ok(request)
    }
}
