//! Incremental line framing shared by the streaming transports.
//!
//! Vendors deliver incremental bodies as newline-delimited frames: SSE
//! `data:` lines for OpenAI-style and Anthropic endpoints, bare NDJSON for
//! Ollama. Network chunks split lines arbitrarily, so decoding buffers
//! until a full line exists.

/// Accumulates arbitrary text chunks and hands back complete lines with
/// the trailing `\n`/`\r\n` removed.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(newline_index) = self.buffer.find('\n') {
            let line = self.buffer.drain(..=newline_index).collect::<String>();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }

        lines
    }
}

/// Extracts the payload of an SSE `data:` line; other SSE fields
/// (`event:`, `id:`, comments, blank keep-alives) return `None`.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_joins_split_chunks() {
        let mut buffer = LineBuffer::new();

        assert!(buffer.push("data: {\"par").is_empty());
        let lines = buffer.push("tial\":1}\ndata: [DONE]\n");
        assert_eq!(
            lines,
            vec![
                "data: {\"partial\":1}".to_string(),
                "data: [DONE]".to_string()
            ]
        );
    }

    #[test]
    fn line_buffer_strips_carriage_returns() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push("one\r\ntwo\n");
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn sse_data_ignores_non_data_fields() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse_data("event: message_start"), None);
        assert_eq!(sse_data(""), None);
    }
}
