//! The uniform vendor adapter contract.

use std::future::Future;
use std::pin::Pin;

use pcommon::VendorName;
use tokio_util::sync::CancellationToken;

use crate::{BoxedDeltaStream, ChatRequest, ChatResponse, VendorError};

pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One implementation per backend. Each adapter owns credential attachment,
/// request-shape translation, and exhaustive error translation into
/// [`VendorError`]; unmapped vendor failures default to `VendorFault`.
///
/// The cancellation token is request-scoped: adapters race it against their
/// network calls and return `Canceled` promptly when it fires. Returned
/// streams own everything they need, so the caller may outlive the borrow
/// on the adapter.
pub trait VendorAdapter: Send + Sync {
    fn vendor(&self) -> VendorName;

    /// Performs one vendor call and resolves once the full answer exists.
    fn send<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<ChatResponse, VendorError>>;

    /// Opens one vendor streaming call. Error classification matches
    /// [`VendorAdapter::send`]; the stream emits deltas until one marked
    /// final or a terminal error ends it early.
    fn send_stream<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> AdapterFuture<'a, Result<BoxedDeltaStream, VendorError>>;

    /// Best-effort model discovery. Adapters may serve a cached list; model
    /// sets rarely change within a process lifetime.
    fn models<'a>(&'a self) -> AdapterFuture<'a, Result<Vec<String>, VendorError>>;
}

impl std::fmt::Debug for dyn VendorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn VendorAdapter")
            .field("vendor", &self.vendor())
            .finish()
    }
}
