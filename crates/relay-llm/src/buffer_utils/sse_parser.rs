use anyhow::Result;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

use super::buffering::CircularLineBuffer;

/// Strategy for turning one SSE event (`event:` name + joined `data:` lines)
/// into typed events
pub trait SseLineParser: Send {
    type Event: Send + 'static;

    fn parse_event(&self, event: Option<&str>, data: &str) -> Result<Vec<Self::Event>>;

    /// Check if this payload signals end of stream
    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }

    /// Event emitted when the done marker is seen
    fn done_event(&self) -> Option<Self::Event>;
}

/// Accumulates the fields of the SSE event currently being read
#[derive(Default)]
struct PendingEvent {
    event: Option<String>,
    data: Vec<String>,
}

impl PendingEvent {
    /// Feed one line; returns a complete event when the line terminates one
    fn feed(&mut self, line: &str) -> Option<(Option<String>, String)> {
        if line.is_empty() {
            return self.flush();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = field_value(line, "event") {
            self.event = Some(value.to_string());
        } else if let Some(value) = field_value(line, "data") {
            self.data.push(value.to_string());
        }
        None
    }

    fn flush(&mut self) -> Option<(Option<String>, String)> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some((self.event.take(), data))
    }
}

fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Generic SSE stream parser using a line buffer
/// Applies the strategy pattern for different event vocabularies
pub fn parse_sse_stream<S, B, E, P>(
    bytes: S,
    parser: P,
) -> Pin<Box<dyn Stream<Item = Result<P::Event>> + Send>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
    P: SseLineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = CircularLineBuffer::with_capacity(4096);
        let mut pending = PendingEvent::default();
        let mut finished = false;

        'chunks: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(line_result) = buffer.next_line() {
                        let line = match line_result {
                            Ok(line) => line,
                            Err(e) => {
                                yield Err(e);
                                continue;
                            }
                        };

                        if let Some((event, data)) = pending.feed(&line) {
                            if parser.is_done_marker(&data) {
                                if let Some(done) = parser.done_event() {
                                    yield Ok(done);
                                }
                                finished = true;
                                break 'chunks;
                            }

                            match parser.parse_event(event.as_deref(), &data) {
                                Ok(events) => {
                                    for event in events {
                                        yield Ok(event);
                                    }
                                }
                                Err(e) => yield Err(e),
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    finished = true;
                    break;
                }
            }
        }

        if !finished {
            if let Some(Ok(line)) = buffer.take_remaining() {
                pending.feed(&line);
            }
            if let Some((event, data)) = pending.flush() {
                if parser.is_done_marker(&data) {
                    if let Some(done) = parser.done_event() {
                        yield Ok(done);
                    }
                } else {
                    match parser.parse_event(event.as_deref(), &data) {
                        Ok(events) => {
                            for event in events {
                                yield Ok(event);
                            }
                        }
                        Err(e) => yield Err(e),
                    }
                }
            }
        }
    })
}
