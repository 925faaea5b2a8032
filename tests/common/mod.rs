#![allow(dead_code)]

use futures_util::future::BoxFuture;
use parrot::{FrameSource, Result, StreamError, CLEAR_SCREEN};

/// In-memory frames; `None` entries fail like a missing remote file.
pub struct StaticSource(pub Vec<Option<&'static str>>);

impl FrameSource for StaticSource {
    fn fetch(&self, index: usize) -> BoxFuture<'_, Result<String>> {
        let res = match self.0.get(index) {
            Some(Some(text)) => Ok(text.to_string()),
            _ => Err(StreamError::Retrieval {
                index,
                reason: "HTTP 404 Not Found".to_string(),
            }),
        };
        Box::pin(std::future::ready(res))
    }
}

/// Split one emitted chunk into its color escape code and frame text.
pub fn parse_chunk(chunk: &str) -> (String, String) {
    let inner = chunk
        .strip_prefix(CLEAR_SCREEN)
        .and_then(|c| c.strip_suffix('\n'))
        .expect("chunk framing");
    let (code, rest) = inner.split_at(5);
    let text = rest.strip_suffix("\x1b[0m").expect("color reset");
    (code.to_string(), text.to_string())
}

/// Split a concatenated body back into chunks.
pub fn split_chunks(body: &str) -> Vec<String> {
    body.split(CLEAR_SCREEN)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{CLEAR_SCREEN}{s}"))
        .collect()
}
