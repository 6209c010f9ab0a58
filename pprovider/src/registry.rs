//! Provider registry: vendor-name lookup and descriptor bookkeeping.
//!
//! Registration is a `&mut self` startup phase; afterwards the registry is
//! shared as `Arc<ProviderRegistry>` and every resolution is a lock-free
//! read of an effectively-immutable map. Reconfiguration is explicit
//! re-registration into a fresh registry, never mutation in place.
//!
//! ```rust
//! use pprovider::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.is_empty());
//! assert_eq!(registry.len(), 0);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use pcommon::{Registry, VendorName};
use tracing::{debug, info};

use crate::VendorAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    pub streaming: bool,
    pub vision: bool,
    pub tools: bool,
}

impl CapabilitySet {
    pub fn streaming_only() -> Self {
        Self {
            streaming: true,
            ..Self::default()
        }
    }

    pub fn with_vision(mut self) -> Self {
        self.vision = true;
        self
    }

    pub fn with_tools(mut self) -> Self {
        self.tools = true;
        self
    }
}

/// Static facts about a registered vendor: the adapter answers live
/// questions, the descriptor answers cheap ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub vendor: VendorName,
    pub models: Vec<String>,
    pub capabilities: CapabilitySet,
}

impl ProviderDescriptor {
    pub fn new(vendor: impl Into<VendorName>) -> Self {
        Self {
            vendor: vendor.into(),
            models: Vec::new(),
            capabilities: CapabilitySet::default(),
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    DuplicateVendor,
    UnknownVendor,
    VendorUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    pub vendor: VendorName,
    pub message: String,
}

impl RegistryError {
    pub fn duplicate_vendor(vendor: impl Into<VendorName>) -> Self {
        let vendor = vendor.into();
        let message = format!("vendor '{vendor}' is already registered");
        Self {
            kind: RegistryErrorKind::DuplicateVendor,
            vendor,
            message,
        }
    }

    pub fn unknown_vendor(vendor: impl Into<VendorName>) -> Self {
        let vendor = vendor.into();
        let message = format!("no adapter registered for vendor '{vendor}'");
        Self {
            kind: RegistryErrorKind::UnknownVendor,
            vendor,
            message,
        }
    }

    pub fn vendor_unavailable(vendor: impl Into<VendorName>, detail: impl Into<String>) -> Self {
        let vendor = vendor.into();
        let message = format!("vendor '{vendor}' could not report: {}", detail.into());
        Self {
            kind: RegistryErrorKind::VendorUnavailable,
            vendor,
            message,
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for RegistryError {}

struct RegistryEntry {
    adapter: Arc<dyn VendorAdapter>,
    descriptor: ProviderDescriptor,
}

#[derive(Default)]
pub struct ProviderRegistry {
    entries: Registry<VendorName, RegistryEntry>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under the descriptor's vendor name. Fails with
    /// `DuplicateVendor` when the name is taken; use
    /// [`ProviderRegistry::register_replacing`] for an explicit overwrite.
    pub fn register<A>(
        &mut self,
        descriptor: ProviderDescriptor,
        adapter: A,
    ) -> Result<(), RegistryError>
    where
        A: VendorAdapter + 'static,
    {
        if self.entries.contains_key(descriptor.vendor.as_str()) {
            return Err(RegistryError::duplicate_vendor(descriptor.vendor));
        }

        self.insert(descriptor, Arc::new(adapter));
        Ok(())
    }

    /// Explicit-overwrite registration, used for credential/config reload.
    pub fn register_replacing<A>(&mut self, descriptor: ProviderDescriptor, adapter: A)
    where
        A: VendorAdapter + 'static,
    {
        self.insert(descriptor, Arc::new(adapter));
    }

    /// [`ProviderRegistry::register`] for adapters already behind an `Arc`.
    pub fn register_arc(
        &mut self,
        descriptor: ProviderDescriptor,
        adapter: Arc<dyn VendorAdapter>,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(descriptor.vendor.as_str()) {
            return Err(RegistryError::duplicate_vendor(descriptor.vendor));
        }

        self.insert(descriptor, adapter);
        Ok(())
    }

    /// [`ProviderRegistry::register_replacing`] for adapters already behind
    /// an `Arc`.
    pub fn register_replacing_arc(
        &mut self,
        descriptor: ProviderDescriptor,
        adapter: Arc<dyn VendorAdapter>,
    ) {
        self.insert(descriptor, adapter);
    }

    fn insert(&mut self, descriptor: ProviderDescriptor, adapter: Arc<dyn VendorAdapter>) {
        info!(vendor = %descriptor.vendor, "registered vendor adapter");
        self.entries.insert(
            descriptor.vendor.clone(),
            RegistryEntry {
                adapter,
                descriptor,
            },
        );
    }

    pub fn resolve(&self, vendor: &str) -> Result<Arc<dyn VendorAdapter>, RegistryError> {
        self.entries
            .get(vendor)
            .map(|entry| Arc::clone(&entry.adapter))
            .ok_or_else(|| RegistryError::unknown_vendor(vendor))
    }

    pub fn descriptor(&self, vendor: &str) -> Option<&ProviderDescriptor> {
        self.entries.get(vendor).map(|entry| &entry.descriptor)
    }

    pub fn vendors(&self) -> impl Iterator<Item = &VendorName> {
        self.entries.keys()
    }

    pub fn contains(&self, vendor: &str) -> bool {
        self.entries.contains_key(vendor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delegates model discovery to the adapter. Adapter failure maps to
    /// `VendorUnavailable` with the vendor detail string; the registry
    /// itself stays healthy.
    pub async fn list_models(&self, vendor: &str) -> Result<Vec<String>, RegistryError> {
        let adapter = self.resolve(vendor)?;
        debug!(vendor, "listing models");
        adapter
            .models()
            .await
            .map_err(|err| RegistryError::vendor_unavailable(vendor, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pcommon::VendorName;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        AdapterFuture, BoxedDeltaStream, ChatRequest, ChatResponse, FinishReason, StreamDelta,
        VecDeltaStream, VendorError,
    };

    struct FakeAdapter {
        name: &'static str,
        models_error: Option<VendorError>,
    }

    impl FakeAdapter {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                models_error: None,
            }
        }

        fn with_models_error(mut self, error: VendorError) -> Self {
            self.models_error = Some(error);
            self
        }
    }

    impl VendorAdapter for FakeAdapter {
        fn vendor(&self) -> VendorName {
            VendorName::from(self.name)
        }

        fn send<'a>(
            &'a self,
            request: ChatRequest,
            _cancel: CancellationToken,
        ) -> AdapterFuture<'a, Result<ChatResponse, VendorError>> {
            Box::pin(async move {
                request.validate()?;
                Ok(ChatResponse {
                    vendor: VendorName::from(self.name),
                    model: request.model,
                    text: "hello from adapter".to_string(),
                    finish: FinishReason::Stop,
                    usage: None,
                    raw: None,
                })
            })
        }

        fn send_stream<'a>(
            &'a self,
            request: ChatRequest,
            _cancel: CancellationToken,
        ) -> AdapterFuture<'a, Result<BoxedDeltaStream, VendorError>> {
            Box::pin(async move {
                request.validate()?;
                let stream = VecDeltaStream::new(vec![
                    Ok(StreamDelta::text("hello")),
                    Ok(StreamDelta::finish(FinishReason::Stop)),
                ]);
                Ok(Box::pin(stream) as BoxedDeltaStream)
            })
        }

        fn models<'a>(&'a self) -> AdapterFuture<'a, Result<Vec<String>, VendorError>> {
            Box::pin(async move {
                match &self.models_error {
                    Some(error) => Err(error.clone()),
                    None => Ok(vec!["model-a".to_string(), "model-b".to_string()]),
                }
            })
        }
    }

    #[test]
    fn duplicate_registration_fails_regardless_of_order() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(ProviderDescriptor::new("echo"), FakeAdapter::new("echo"))
            .expect("first registration works");

        let err = registry
            .register(ProviderDescriptor::new("echo"), FakeAdapter::new("echo"))
            .expect_err("second registration must fail");
        assert_eq!(err.kind, RegistryErrorKind::DuplicateVendor);
        assert_eq!(err.vendor, VendorName::from("echo"));

        registry.register_replacing(ProviderDescriptor::new("echo"), FakeAdapter::new("echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_unknown_vendor_fails_without_poisoning_registry() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(ProviderDescriptor::new("openai"), FakeAdapter::new("openai"))
            .expect("registration works");

        let err = registry.resolve("mystery").expect_err("unknown must fail");
        assert_eq!(err.kind, RegistryErrorKind::UnknownVendor);

        assert!(registry.resolve("openai").is_ok());
        assert!(registry.contains("openai"));
    }

    #[test]
    fn descriptor_bookkeeping_survives_registration() {
        let mut registry = ProviderRegistry::new();
        let descriptor = ProviderDescriptor::new("anthropic")
            .with_models(vec!["claude-sonnet-4-5".to_string()])
            .with_capabilities(CapabilitySet::streaming_only().with_tools());

        registry
            .register(descriptor.clone(), FakeAdapter::new("anthropic"))
            .expect("registration works");

        let stored = registry
            .descriptor("anthropic")
            .expect("descriptor should exist");
        assert_eq!(stored, &descriptor);
        assert!(stored.capabilities.streaming);
        assert!(stored.capabilities.tools);
        assert!(!stored.capabilities.vision);
    }

    #[tokio::test]
    async fn list_models_delegates_and_maps_failures() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(ProviderDescriptor::new("openai"), FakeAdapter::new("openai"))
            .expect("registration works");
        registry
            .register(
                ProviderDescriptor::new("flaky"),
                FakeAdapter::new("flaky")
                    .with_models_error(VendorError::fault("connection refused")),
            )
            .expect("registration works");

        let models = registry.list_models("openai").await.expect("models listed");
        assert_eq!(models, vec!["model-a".to_string(), "model-b".to_string()]);

        let err = registry
            .list_models("flaky")
            .await
            .expect_err("flaky vendor must fail");
        assert_eq!(err.kind, RegistryErrorKind::VendorUnavailable);
        assert!(err.message.contains("connection refused"));

        let err = registry
            .list_models("mystery")
            .await
            .expect_err("unknown vendor must fail");
        assert_eq!(err.kind, RegistryErrorKind::UnknownVendor);
    }
}
