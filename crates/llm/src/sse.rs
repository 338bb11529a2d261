//! Server-sent-event framing for streaming generation responses.
//!
//! The streaming endpoint delivers one JSON chunk per `data:` line. This
//! module turns the raw byte stream into a stream of text fragments, keeping
//! the line parser pure so it can be tested without a network.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::LlmError;
use crate::gemini::GenerateContentResponse;

/// Adapt a raw response body into a stream of reply fragments.
///
/// The stream is finite and non-restartable; transport errors surface as
/// `LlmError::Request` items and end the useful life of the stream.
pub(crate) fn fragment_stream(
    body: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = Result<String, LlmError>> + Send {
    let state = SseState {
        body: body.boxed(),
        buffer: String::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            // Drain complete lines already buffered.
            while let Some(pos) = state.buffer.find('\n') {
                let line: String = state.buffer.drain(..=pos).collect();
                if let Some(item) = parse_data_line(line.trim_end()) {
                    return Some((item, state));
                }
            }

            if state.done {
                // Flush any trailing data that arrived without a newline.
                let rest = std::mem::take(&mut state.buffer);
                return parse_data_line(rest.trim_end()).map(|item| (item, state));
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.buffer.push_str(&String::from_utf8_lossy(&chunk)),
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(LlmError::transport(err)), state));
                }
                None => state.done = true,
            }
        }
    })
}

struct SseState {
    body: futures::stream::BoxStream<'static, Result<Bytes, reqwest::Error>>,
    buffer: String,
    done: bool,
}

/// Parse one SSE line into a reply fragment.
///
/// Non-data lines, keep-alives, and chunks without text yield `None`.
fn parse_data_line(line: &str) -> Option<Result<String, LlmError>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<GenerateContentResponse>(data) {
        Ok(chunk) => {
            let text = chunk.text();
            if text.is_empty() {
                None
            } else {
                Some(Ok(text))
            }
        }
        Err(err) => Some(Err(LlmError::Parse(format!(
            "malformed stream chunk: {}",
            err
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_line(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{}\"}}]}}}}]}}\n\n",
            text
        )
    }

    fn collect(chunks: Vec<&str>) -> Vec<Result<String, LlmError>> {
        let byte_chunks: Vec<Result<Bytes, reqwest::Error>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
            .collect();
        let stream = fragment_stream(futures::stream::iter(byte_chunks));
        futures::executor::block_on(stream.collect::<Vec<_>>())
    }

    #[test]
    fn single_event_yields_fragment() {
        let event = data_line("Hello");
        let items = collect(vec![&event]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "Hello");
    }

    #[test]
    fn fragments_arrive_in_order() {
        let events = format!("{}{}{}", data_line("one "), data_line("two "), data_line("three"));
        let items = collect(vec![&events]);
        let texts: Vec<String> = items.into_iter().map(|i| i.unwrap()).collect();
        assert_eq!(texts, vec!["one ", "two ", "three"]);
    }

    #[test]
    fn event_split_across_chunks_is_reassembled() {
        let event = data_line("split across the wire");
        let (a, b) = event.split_at(25);
        let items = collect(vec![a, b]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "split across the wire");
    }

    #[test]
    fn crlf_line_endings_accepted() {
        let event = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"crlf\"}]}}]}\r\n\r\n";
        let items = collect(vec![event]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "crlf");
    }

    #[test]
    fn keep_alives_and_done_marker_skipped() {
        let body = format!(": keep-alive\n\ndata: [DONE]\n\n{}", data_line("real"));
        let items = collect(vec![&body]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "real");
    }

    #[test]
    fn chunk_without_text_skipped() {
        let body = "data: {\"candidates\":[{\"content\":{\"parts\":[]}}]}\n\n";
        let items = collect(vec![body]);
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_chunk_surfaces_parse_error() {
        let body = "data: {not json}\n\n";
        let items = collect(vec![body]);
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(LlmError::Parse(_))));
    }

    #[test]
    fn trailing_event_without_newline_flushed() {
        let event = data_line("tail");
        let trimmed = event.trim_end().to_string();
        let items = collect(vec![&trimmed]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "tail");
    }
}
