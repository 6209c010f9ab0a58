//! The dispatch façade: registry lookup, model stamping, retry, and
//! stream normalization behind one call surface.

use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use futures_util::StreamExt;
use pprovider::{
    BoxedDeltaStream, ChatRequest, ChatResponse, ProviderRegistry, StreamDelta, VendorError,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mux::multiplex;
use crate::retry::{DispatchHooks, NoopDispatchHooks, RetryPolicy, execute_with_retry};
use crate::DispatchError;

pub type DispatchStream =
    Pin<Box<dyn Stream<Item = Result<StreamDelta, DispatchError>> + Send + 'static>>;

/// Either shape of a finished dispatch, selected by the request's `stream`
/// option.
pub enum DispatchOutcome {
    Response(ChatResponse),
    Stream(DispatchStream),
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    policy: RetryPolicy,
    hooks: Arc<dyn DispatchHooks>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            policy: RetryPolicy::default(),
            hooks: Arc::new(NoopDispatchHooks),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Dispatches per the request's `stream` option.
    pub async fn dispatch(
        &self,
        request: ChatRequest,
        vendor: &str,
        model: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch_cancellable(request, vendor, model, CancellationToken::new())
            .await
    }

    pub async fn dispatch_cancellable(
        &self,
        request: ChatRequest,
        vendor: &str,
        model: &str,
        cancel: CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        if request.options.stream {
            let stream = self
                .stream_cancellable(request, vendor, model, cancel)
                .await?;
            Ok(DispatchOutcome::Stream(stream))
        } else {
            let response = self
                .send_cancellable(request, vendor, model, cancel)
                .await?;
            Ok(DispatchOutcome::Response(response))
        }
    }

    /// One blocking vendor call. Retries happen before anything reaches the
    /// caller, so a retried attempt is invisible except as latency.
    pub async fn send(
        &self,
        request: ChatRequest,
        vendor: &str,
        model: &str,
    ) -> Result<ChatResponse, DispatchError> {
        self.send_cancellable(request, vendor, model, CancellationToken::new())
            .await
    }

    pub async fn send_cancellable(
        &self,
        request: ChatRequest,
        vendor: &str,
        model: &str,
        cancel: CancellationToken,
    ) -> Result<ChatResponse, DispatchError> {
        let adapter = self.registry.resolve(vendor)?;
        let vendor_name = adapter.vendor();
        let request = request.with_model(model);
        debug!(vendor = %vendor_name, model, "dispatching send");

        let response = execute_with_retry(
            &vendor_name,
            "send",
            &self.policy,
            self.hooks.as_ref(),
            |_attempt| {
                let adapter = Arc::clone(&adapter);
                let request = request.clone();
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return Err(VendorError::canceled("request canceled"));
                    }

                    adapter.send(request, cancel).await
                }
            },
            |delay| cancellable_sleep(delay, cancel.clone()),
        )
        .await?;

        Ok(response)
    }

    /// Opens one vendor stream and wraps it in the multiplexer. Retries
    /// cover only the opening call; once a delta has flowed, a failure is
    /// terminal.
    pub async fn stream(
        &self,
        request: ChatRequest,
        vendor: &str,
        model: &str,
    ) -> Result<DispatchStream, DispatchError> {
        self.stream_cancellable(request, vendor, model, CancellationToken::new())
            .await
    }

    pub async fn stream_cancellable(
        &self,
        request: ChatRequest,
        vendor: &str,
        model: &str,
        cancel: CancellationToken,
    ) -> Result<DispatchStream, DispatchError> {
        let adapter = self.registry.resolve(vendor)?;
        let vendor_name = adapter.vendor();
        let request = request.with_model(model).enable_streaming();
        debug!(vendor = %vendor_name, model, "dispatching stream");

        let inner: BoxedDeltaStream = execute_with_retry(
            &vendor_name,
            "send_stream",
            &self.policy,
            self.hooks.as_ref(),
            |_attempt| {
                let adapter = Arc::clone(&adapter);
                let request = request.clone();
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return Err(VendorError::canceled("request canceled"));
                    }

                    adapter.send_stream(request, cancel).await
                }
            },
            |delay| cancellable_sleep(delay, cancel.clone()),
        )
        .await?;

        let muxed = multiplex(inner, cancel);
        Ok(Box::pin(muxed.map(|item| item.map_err(DispatchError::from))) as DispatchStream)
    }
}

/// Backoff sleep that ends early on cancellation; the next attempt then
/// observes the token and returns `Canceled`.
async fn cancellable_sleep(delay: std::time::Duration, cancel: CancellationToken) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }
}
