//! Dispatch orchestration over registered vendor adapters: retry policy,
//! stream multiplexing, and the canonical caller-facing error.

mod dispatcher;
mod error;
mod mux;
mod retry;

pub mod prelude {
    pub use crate::{
        DispatchError, DispatchErrorKind, DispatchHooks, DispatchOutcome, DispatchStream,
        Dispatcher, NoopDispatchHooks, RetryPolicy, execute_with_retry, multiplex,
    };
    pub use pprovider::prelude::*;
}

pub use dispatcher::{DispatchOutcome, DispatchStream, Dispatcher};
pub use error::{DispatchError, DispatchErrorKind};
pub use mux::multiplex;
pub use retry::{DispatchHooks, NoopDispatchHooks, RetryPolicy, execute_with_retry};
