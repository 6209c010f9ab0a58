//! OpenAI chat-completions adapter: injectable transport over the
//! documented REST and SSE streaming protocol.

mod adapter;
mod payload;
mod transport;
mod types;

#[cfg(test)]
mod tests;

pub use adapter::{OPENAI_VENDOR, OpenAiAdapter};
pub use transport::{OPENAI_BASE_URL, OpenAiChunkStream, OpenAiHttpTransport, OpenAiTransport};
pub use types::{
    OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiRole,
    OpenAiStreamChunk, OpenAiTool, OpenAiUsage,
};
