//! Unified facade over the parlance workspace crates.
//!
//! This crate is designed to be the single dependency for most
//! applications: assemble a request with [`assemble`], bootstrap a registry
//! with [`providers::bootstrap_registry`], and hand both to a
//! [`Dispatcher`].
//!
//! ```rust
//! use parlance::prelude::*;
//!
//! # fn main() -> Result<(), VendorError> {
//! let (registry, _vault) = bootstrap_registry(vec![])?;
//! let dispatcher = Dispatcher::new(registry);
//! let request = assemble(
//!     Some(&Pattern::new("summarize", "Summarize the text.")),
//!     None,
//!     &[],
//!     "The sky is blue.",
//!     GenerationOptions::default(),
//! )
//! .expect("assembly works");
//!
//! assert_eq!(request.messages.len(), 2);
//! let _ = dispatcher;
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod prelude;
pub mod providers;
pub mod util;

pub use pcommon;
pub use pdispatch;
pub use pprompt;
pub use pprovider;

pub use pcommon::{BoxFuture, GenerationOptions, MetadataMap, VendorName};
pub use pdispatch::{
    DispatchError, DispatchErrorKind, DispatchHooks, DispatchOutcome, DispatchStream, Dispatcher,
    NoopDispatchHooks, RetryPolicy, execute_with_retry, multiplex,
};
pub use pprompt::{
    INPUT_VARIABLE, Pattern, PromptAssembly, Strategy, TemplateError, TemplateVars, assemble,
    assemble_with_vars, render,
};
pub use pprovider::{
    AdapterFuture, Attachment, AttachmentKind, BoxedDeltaStream, CancellationToken, CapabilitySet,
    ChatDeltaStream, ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, CredentialVault,
    FinishReason, ModelListCache, ProviderDescriptor, ProviderRegistry, RegistryError,
    RegistryErrorKind, Role, SecretString, StreamDelta, TokenUsage, ToolDefinition,
    VecDeltaStream, VendorAdapter, VendorError, VendorErrorKind, VendorExtras,
};

pub use providers::{VendorBuildConfig, bootstrap_registry, build_vendor};
pub use util::{
    assistant_message, collect_stream_text, system_message, tool_message, user_message,
};

#[cfg(test)]
mod tests {
    use crate::Role;

    #[test]
    fn pl_msg_macro_creates_expected_message() {
        let message = crate::pl_msg!(user => "hello");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "hello");
    }

    #[test]
    fn pl_messages_macro_builds_message_vector() {
        let messages = crate::pl_messages![
            system => "You are concise.",
            user => "Summarize the repo",
        ];

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }
}
