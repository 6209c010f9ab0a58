//! Small request-building and stream-draining helpers.

use futures_util::StreamExt;
use pdispatch::{DispatchError, DispatchStream};
use pprovider::{ChatMessage, FinishReason, Role};

pub fn system_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage::new(Role::System, content)
}

pub fn user_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage::new(Role::User, content)
}

pub fn assistant_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage::new(Role::Assistant, content)
}

pub fn tool_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage::new(Role::Tool, content)
}

/// Drains a dispatch stream to completion, concatenating delta text.
///
/// Partial text is returned alongside the terminal error when the stream
/// fails mid-flight; delivered output is never discarded.
pub async fn collect_stream_text(
    mut stream: DispatchStream,
) -> (String, Option<FinishReason>, Option<DispatchError>) {
    let mut text = String::new();
    let mut finish = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => {
                text.push_str(&delta.text);
                if delta.is_final {
                    finish = delta.finish;
                }
            }
            Err(error) => return (text, finish, Some(error)),
        }
    }

    (text, finish, None)
}
