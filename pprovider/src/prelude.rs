//! Common `pprovider` imports for downstream crates.

pub use crate::{
    AdapterFuture, Attachment, AttachmentKind, BoxedDeltaStream, CapabilitySet, ChatDeltaStream,
    ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, CredentialVault, FinishReason,
    ModelListCache, ProviderDescriptor, ProviderRegistry, RegistryError, RegistryErrorKind, Role,
    SecretString, StreamDelta, TokenUsage, ToolDefinition, VecDeltaStream, VendorAdapter,
    VendorError, VendorErrorKind, VendorExtras,
};
pub use crate::CancellationToken;
pub use pcommon::{BoxFuture, GenerationOptions, MetadataMap, VendorName};
