//! Vendor adapters. Each module speaks one backend's documented wire
//! protocol and translates it into the uniform contract.

pub mod echo;

#[cfg(any(
    feature = "vendor-openai",
    feature = "vendor-anthropic",
    feature = "vendor-ollama"
))]
pub(crate) mod framing;

#[cfg(any(
    feature = "vendor-openai",
    feature = "vendor-anthropic",
    feature = "vendor-ollama"
))]
pub(crate) mod http;

#[cfg(feature = "vendor-openai")]
pub mod openai;

#[cfg(feature = "vendor-anthropic")]
pub mod anthropic;

#[cfg(feature = "vendor-ollama")]
pub mod ollama;
