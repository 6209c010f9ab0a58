//! Everything an application typically needs in one import.

pub use crate::providers::{VendorBuildConfig, bootstrap_registry, build_vendor};
pub use crate::util::{
    assistant_message, collect_stream_text, system_message, tool_message, user_message,
};
pub use pcommon::{BoxFuture, GenerationOptions, MetadataMap, VendorName};
pub use pdispatch::{
    DispatchError, DispatchErrorKind, DispatchHooks, DispatchOutcome, DispatchStream, Dispatcher,
    NoopDispatchHooks, RetryPolicy,
};
pub use pprompt::{
    Pattern, PromptAssembly, Strategy, TemplateError, TemplateVars, assemble, assemble_with_vars,
};
pub use pprovider::{
    Attachment, AttachmentKind, BoxedDeltaStream, CancellationToken, CapabilitySet, ChatMessage,
    ChatRequest, ChatRequestBuilder, ChatResponse, CredentialVault, FinishReason,
    ProviderDescriptor, ProviderRegistry, RegistryError, RegistryErrorKind, Role, SecretString,
    StreamDelta, TokenUsage, ToolDefinition, VendorAdapter, VendorError, VendorErrorKind,
    VendorExtras,
};
