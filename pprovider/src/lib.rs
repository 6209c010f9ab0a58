//! Uniform vendor adapter contract, provider registry, and chat data model.
//!
//! One `ChatRequest` goes in, one `ChatResponse` or delta stream comes out,
//! no matter which backend serves it. Adapters translate wire protocols and
//! error payloads at this boundary; nothing vendor-specific crosses it.

mod adapter;
mod catalog;
mod credentials;
mod error;
mod model;
mod registry;
mod stream;

pub mod adapters;
pub mod prelude;

pub use adapter::{AdapterFuture, VendorAdapter};
pub use catalog::{DEFAULT_MODEL_LIST_TTL, ModelListCache};
pub use credentials::{CredentialVault, SecretString};
pub use error::{VendorError, VendorErrorKind};
pub use model::{
    Attachment, AttachmentKind, ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse,
    FinishReason, Role, TokenUsage, ToolDefinition, VendorExtras,
};
pub use registry::{
    CapabilitySet, ProviderDescriptor, ProviderRegistry, RegistryError, RegistryErrorKind,
};
pub use stream::{BoxedDeltaStream, ChatDeltaStream, StreamDelta, VecDeltaStream};

pub use tokio_util::sync::CancellationToken;
