//! Stable vendor construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use pcommon::VendorName;
use pprovider::adapters::echo::{ECHO_VENDOR, EchoAdapter};
use pprovider::{
    CapabilitySet, CredentialVault, ProviderDescriptor, ProviderRegistry, VendorAdapter,
    VendorError,
};
use reqwest::Client;

#[derive(Debug, Clone)]
pub struct VendorBuildConfig {
    pub vendor: VendorName,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub fallback_model: Option<String>,
    pub timeout: Duration,
}

impl VendorBuildConfig {
    pub fn new(vendor: impl Into<VendorName>) -> Self {
        Self {
            vendor: vendor.into(),
            api_key: None,
            base_url: None,
            organization: None,
            fallback_model: None,
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Builds the adapter plus its descriptor for one configured vendor.
///
/// A missing API key is not an error here: the key simply stays out of the
/// vault and the vendor fails with `Auth` on first use, so unconfigured
/// vendors never block startup.
pub fn build_vendor(
    config: VendorBuildConfig,
    vault: Arc<CredentialVault>,
) -> Result<(ProviderDescriptor, Arc<dyn VendorAdapter>), VendorError> {
    let client = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| VendorError::fault(err.to_string()))?;

    match config.vendor.as_str() {
        "openai" => build_openai(config, vault, client),
        "anthropic" => build_anthropic(config, vault, client),
        "ollama" => build_ollama(config, client),
        ECHO_VENDOR => Ok((echo_descriptor(), Arc::new(EchoAdapter::new()))),
        other => Err(VendorError::invalid_request(format!(
            "no adapter implementation for vendor '{other}'"
        ))),
    }
}

/// Wires every configured vendor plus the echo loopback into a fresh
/// registry. The registry is the effectively-immutable product of this
/// startup phase; reconfiguration means calling this again.
pub fn bootstrap_registry(
    configs: Vec<VendorBuildConfig>,
) -> Result<(Arc<ProviderRegistry>, Arc<CredentialVault>), VendorError> {
    let vault = Arc::new(CredentialVault::new());
    let mut registry = ProviderRegistry::new();

    for config in configs {
        let (descriptor, adapter) = build_vendor(config, Arc::clone(&vault))?;
        registry
            .register_arc(descriptor, adapter)
            .map_err(|err| VendorError::invalid_request(err.to_string()))?;
    }

    if !registry.contains(ECHO_VENDOR) {
        registry.register_replacing_arc(echo_descriptor(), Arc::new(EchoAdapter::new()));
    }

    Ok((Arc::new(registry), vault))
}

fn echo_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(ECHO_VENDOR)
        .with_models(vec![ECHO_VENDOR.to_string()])
        .with_capabilities(CapabilitySet::streaming_only())
}

#[cfg(feature = "vendor-openai")]
fn build_openai(
    config: VendorBuildConfig,
    vault: Arc<CredentialVault>,
    client: Client,
) -> Result<(ProviderDescriptor, Arc<dyn VendorAdapter>), VendorError> {
    use pprovider::adapters::openai::{OPENAI_VENDOR, OpenAiAdapter};

    if let Some(api_key) = config.api_key {
        vault.set_openai_api_key(api_key)?;
    }

    let mut transport = OpenAiAdapter::default_http_transport(client);
    if let Some(base_url) = config.base_url {
        transport = transport.with_base_url(base_url);
    }
    if let Some(organization) = config.organization {
        transport = transport.with_organization(organization);
    }

    let mut adapter = OpenAiAdapter::new(vault, Arc::new(transport));
    if let Some(model) = config.fallback_model {
        adapter = adapter.with_fallback_model(model);
    }

    let descriptor = ProviderDescriptor::new(OPENAI_VENDOR)
        .with_capabilities(CapabilitySet::streaming_only().with_vision().with_tools());
    Ok((descriptor, Arc::new(adapter)))
}

#[cfg(not(feature = "vendor-openai"))]
fn build_openai(
    _config: VendorBuildConfig,
    _vault: Arc<CredentialVault>,
    _client: Client,
) -> Result<(ProviderDescriptor, Arc<dyn VendorAdapter>), VendorError> {
    Err(VendorError::invalid_request(
        "the vendor-openai feature is not enabled on parlance",
    ))
}

#[cfg(feature = "vendor-anthropic")]
fn build_anthropic(
    config: VendorBuildConfig,
    vault: Arc<CredentialVault>,
    client: Client,
) -> Result<(ProviderDescriptor, Arc<dyn VendorAdapter>), VendorError> {
    use pprovider::adapters::anthropic::{ANTHROPIC_VENDOR, AnthropicAdapter};

    if let Some(api_key) = config.api_key {
        vault.set_anthropic_api_key(api_key)?;
    }

    let mut transport = AnthropicAdapter::default_http_transport(client);
    if let Some(base_url) = config.base_url {
        transport = transport.with_base_url(base_url);
    }

    let mut adapter = AnthropicAdapter::new(vault, Arc::new(transport));
    if let Some(model) = config.fallback_model {
        adapter = adapter.with_fallback_model(model);
    }

    let descriptor = ProviderDescriptor::new(ANTHROPIC_VENDOR)
        .with_capabilities(CapabilitySet::streaming_only().with_vision().with_tools());
    Ok((descriptor, Arc::new(adapter)))
}

#[cfg(not(feature = "vendor-anthropic"))]
fn build_anthropic(
    _config: VendorBuildConfig,
    _vault: Arc<CredentialVault>,
    _client: Client,
) -> Result<(ProviderDescriptor, Arc<dyn VendorAdapter>), VendorError> {
    Err(VendorError::invalid_request(
        "the vendor-anthropic feature is not enabled on parlance",
    ))
}

#[cfg(feature = "vendor-ollama")]
fn build_ollama(
    config: VendorBuildConfig,
    client: Client,
) -> Result<(ProviderDescriptor, Arc<dyn VendorAdapter>), VendorError> {
    use pprovider::adapters::ollama::{OLLAMA_VENDOR, OllamaAdapter};

    let mut transport = OllamaAdapter::default_http_transport(client);
    if let Some(base_url) = config.base_url {
        transport = transport.with_base_url(base_url);
    }

    let mut adapter = OllamaAdapter::new(Arc::new(transport));
    if let Some(model) = config.fallback_model {
        adapter = adapter.with_fallback_model(model);
    }

    let descriptor = ProviderDescriptor::new(OLLAMA_VENDOR)
        .with_capabilities(CapabilitySet::streaming_only().with_tools());
    Ok((descriptor, Arc::new(adapter)))
}

#[cfg(not(feature = "vendor-ollama"))]
fn build_ollama(
    _config: VendorBuildConfig,
    _client: Client,
) -> Result<(ProviderDescriptor, Arc<dyn VendorAdapter>), VendorError> {
    Err(VendorError::invalid_request(
        "the vendor-ollama feature is not enabled on parlance",
    ))
}
